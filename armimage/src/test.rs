use super::*;

#[test]
fn write_read_round_trips() {
    let path = "test_round_trip.armimage";

    let instructions = vec![0xE3A0_0005, 0xE3A0_1000, 0xEF00_0011];
    let data = vec![0x0000_002A];

    let image_orig = ArmImage::new(8, instructions, data);

    write_file(path, &image_orig).unwrap();
    let image_read = read_file(path).unwrap();

    assert_eq!(image_orig, image_read);

    std::fs::remove_file(path).unwrap();
}

#[test]
fn words_concatenates_instructions_then_data() {
    let image = ArmImage::new(0, vec![1, 2], vec![3, 4]);
    assert_eq!(image.words(), vec![1, 2, 3, 4]);
}
