//! Target configuration. Constructed once, by `runarm`, from `clap` flags,
//! and threaded down read-only from there - no other crate in the
//! workspace mutates it.

/// Which floating point sub-architecture the builders and encoder target.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FpArch {
    Fpa,
    Vfp,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Settings {
    pub fp_arch: FpArch,
    pub start_address: u32,
    pub heap_size: u32,
    pub memory_size: u32,
}

impl Settings {
    pub fn new(fp_arch: FpArch, start_address: u32, heap_size: u32, memory_size: u32) -> Settings {
        Settings {
            fp_arch,
            start_address,
            heap_size,
            memory_size,
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            fp_arch: FpArch::Vfp,
            start_address: 0x8000,
            heap_size: 0x10000,
            memory_size: 0x100000,
        }
    }
}
