#[macro_use]
extern crate clap;

use clap::Arg;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("FILE")
                .help("Sets the raw ARM image to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("memory")
                .short("m")
                .long("memory")
                .takes_value(true)
                .value_name("BYTES")
                .default_value("1048576")
                .help("Sets the size of the VM's memory in bytes"),
        )
        .arg(
            Arg::with_name("disassemble")
                .short("d")
                .long("disassemble")
                .help("Prints a disassembly of the image before executing it"),
        )
        .get_matches();

    let file = matches.value_of("FILE").unwrap();
    let memory = value_t!(matches.value_of("memory"), u32).unwrap_or_else(|e| e.exit());
    let disassemble = matches.is_present("disassemble");

    match runarm::run(file, memory, disassemble) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("runarm: {}", e);
            std::process::exit(1);
        }
    }
}
