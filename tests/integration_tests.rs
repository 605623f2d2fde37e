use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use assert_cmd::Command;
use predicates::str::{contains, diff};

/// Write a program image to a scratch file, origin word first.
fn image(name: &str, origin: u16, words: &[u16]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("braid-{name}.lc3"));
    let mut file = File::create(&path).unwrap();
    file.write_all(&origin.to_be_bytes()).unwrap();
    for word in words {
        file.write_all(&word.to_be_bytes()).unwrap();
    }
    path
}

fn braid() -> Command {
    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.timeout(Duration::from_secs(5));
    cmd
}

#[test]
fn halts_immediately() {
    let path = image("halt", 0x3000, &[0xF025]);
    braid().arg(path).assert().success().stdout(diff("HALT\n"));
}

#[test]
fn prints_a_string() {
    // LEA R0, #2 ; PUTS ; HALT ; "Hi"
    let path = image(
        "puts",
        0x3000,
        &[0xE002, 0xF022, 0xF025, 0x0048, 0x0069, 0x0000],
    );
    braid()
        .arg(path)
        .assert()
        .success()
        .stdout(diff("HiHALT\n"));
}

#[test]
fn prints_a_packed_string() {
    // LEA R0, #2 ; PUTSP ; HALT ; "ab" packed, then a lone "c"
    // The zero high byte of the final word must not reach the output.
    let path = image(
        "putsp",
        0x3000,
        &[0xE002, 0xF024, 0xF025, 0x6261, 0x0063, 0x0000],
    );
    braid()
        .arg(path)
        .assert()
        .success()
        .stdout(diff("abcHALT\n"));
}

#[test]
fn echoes_a_byte_through_getc_and_out() {
    // GETC ; OUT ; HALT
    let path = image("getc", 0x3000, &[0xF020, 0xF021, 0xF025]);
    braid()
        .arg(path)
        .write_stdin("A")
        .assert()
        .success()
        .stdout(diff("AHALT\n"));
}

#[test]
fn prompts_and_echoes_through_in() {
    // IN ; HALT
    let path = image("in", 0x3000, &[0xF023, 0xF025]);
    braid()
        .arg(path)
        .write_stdin("Z")
        .assert()
        .success()
        .stdout(diff("Enter a character: ZHALT\n"));
}

#[test]
fn getc_at_end_of_input_reads_a_zero_byte() {
    // GETC ; ADD R0, R0, #0 ; BRz #1 ; OUT ; HALT -- the OUT must be skipped
    let path = image("eof", 0x3000, &[0xF020, 0x1020, 0x0401, 0xF021, 0xF025]);
    braid().arg(path).assert().success().stdout(diff("HALT\n"));
}

#[test]
fn polls_the_keyboard_through_the_device_registers() {
    // Spin on KBSR until bit 15 is set, then fetch the byte from KBDR
    // and print it.
    let path = image(
        "kbsr",
        0x3000,
        &[
            0xA005, // LDI R0, KBSR
            0x07FE, // BRzp #-2
            0xA204, // LDI R1, KBDR
            0x1060, // ADD R0, R1, #0
            0xF021, // OUT
            0xF025, // HALT
            0xFE00, 0xFE02,
        ],
    );
    braid()
        .arg(path)
        .write_stdin("A")
        .assert()
        .success()
        .stdout(diff("AHALT\n"));
}

#[test]
fn later_images_overwrite_earlier_ones() {
    let first = image("overwrite-a", 0x3000, &[0xF025]);
    let second = image(
        "overwrite-b",
        0x3000,
        &[0xE002, 0xF022, 0xF025, 0x0048, 0x0069, 0x0000],
    );
    braid()
        .arg(first)
        .arg(second)
        .assert()
        .success()
        .stdout(diff("HiHALT\n"));
}

#[test]
fn reserved_opcode_aborts() {
    let path = image("reserved", 0x3000, &[0xD000]);
    braid()
        .arg(path)
        .assert()
        .failure()
        .stderr(contains("reserved instruction"));
}

#[test]
fn supervisor_return_aborts() {
    let path = image("rti", 0x3000, &[0x8000]);
    braid()
        .arg(path)
        .assert()
        .failure()
        .stderr(contains("unsupported instruction"));
}

#[test]
fn requires_at_least_one_image() {
    braid().assert().failure().code(2);
}

#[test]
fn reports_an_unreadable_image() {
    braid()
        .arg("no-such-image.lc3")
        .assert()
        .failure()
        .code(1)
        .stdout(contains("failed to load image: no-such-image.lc3"));
}

#[test]
fn reports_a_truncated_image() {
    let path = std::env::temp_dir().join("braid-truncated.lc3");
    File::create(&path).unwrap().write_all(&[0x30]).unwrap();
    braid()
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stdout(contains("failed to load image"));
}
