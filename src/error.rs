use miette::{miette, Report, Severity};

// Runtime errors

pub fn exec_unsupported(addr: u16, instr: u16) -> Report {
    miette!(
        severity = Severity::Error,
        code = "exec::rti",
        help = "supervisor-mode instructions are not available on this machine.",
        "Executed unsupported instruction 0x{instr:04X} at 0x{addr:04X}.",
    )
}

pub fn exec_reserved(addr: u16, instr: u16) -> Report {
    miette!(
        severity = Severity::Error,
        code = "exec::reserved",
        help = "opcode 0xD is reserved and cannot appear in a valid program.",
        "Executed reserved instruction 0x{instr:04X} at 0x{addr:04X}.",
    )
}

// Host I/O errors

pub fn host_output(err: std::io::Error) -> Report {
    miette!(
        severity = Severity::Error,
        code = "trap::out",
        help = "the host output stream closed or failed mid-write.",
        "Failed to write program output: {err}",
    )
}

// Loader errors

pub fn image_no_origin() -> Report {
    miette!(
        severity = Severity::Error,
        code = "image::orig",
        help = "a valid image starts with a 16-bit big-endian load address.",
        "Image file is too short to contain an origin word.",
    )
}
