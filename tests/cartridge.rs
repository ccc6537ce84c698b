use std::fs;

use tempfile::tempdir;

use dotmatrix_core::{
    cartridge::{BOOT_ROM, Cartridge, ControllerKind},
    gameboy::{GameBoy, SAVE_FILE_MBC_OFFSET},
    mbc::RAM_BANK_SIZE,
    mmu::Mmu,
};

#[test]
fn rom_only_header_selects_the_plain_controller() {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x00;
    rom[0x0148] = 0x00;
    rom[0x0149] = 0x00;

    let mut mmu = Mmu::new();
    let cart = Cartridge::insert(rom, &mut mmu).unwrap();
    assert_eq!(cart.kind, ControllerKind::RomOnly);
    assert_eq!(cart.rom_banks, 2);
    assert_eq!(cart.ram_banks, 0);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
}

#[test]
fn save_state_roundtrips_through_the_save_file() {
    let dir = tempdir().unwrap();
    let rom_path = dir.path().join("game.gb");
    let save_path = dir.path().join("game.sav");

    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x03; // MBC1 + RAM + Battery
    rom[0x0149] = 0x03; // 4 banks
    fs::write(&rom_path, &rom).unwrap();

    let mut gb = GameBoy::new();
    gb.load_rom(&rom_path).unwrap();
    gb.mmu.write_byte(0x0000, 0x0A); // enable RAM
    gb.mmu.write_byte(0x6000, 0x01); // mode 1
    gb.mmu.write_byte(0x4000, 0x02); // RAM bank 2
    gb.mmu.write_byte(0xA000, 0xDE);
    gb.mmu.write_byte(0xA001, 0xAD);
    gb.save_state(&save_path).unwrap();

    let data = fs::read(&save_path).unwrap();
    assert_eq!(data.len() as u64, SAVE_FILE_MBC_OFFSET + 3 + 4 * RAM_BANK_SIZE as u64);
    let base = SAVE_FILE_MBC_OFFSET as usize;
    assert_eq!(&data[base..base + 3], &[1, 2, 1]);

    let mut restored = GameBoy::new();
    restored.load_rom(&rom_path).unwrap();
    restored.load_state(&save_path).unwrap();
    // The fixed layout has no mode bit, so reselect bank 2 before reading.
    restored.mmu.write_byte(0x6000, 0x01);
    restored.mmu.write_byte(0x4000, 0x02);
    assert_eq!(restored.mmu.read_byte(0xA000), 0xDE);
    assert_eq!(restored.mmu.read_byte(0xA001), 0xAD);
}

#[test]
fn battery_save_is_adopted_and_restored_on_load() {
    let dir = tempdir().unwrap();
    let rom_path = dir.path().join("battery.gb");

    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x03; // MBC1 + RAM + Battery
    rom[0x0149] = 0x02; // one bank
    fs::write(&rom_path, &rom).unwrap();

    let mut gb = GameBoy::new();
    gb.load_rom(&rom_path).unwrap();
    gb.mmu.write_byte(0x0000, 0x0A);
    gb.mmu.write_byte(0xA123, 0x77);
    gb.save_battery().unwrap();
    assert!(rom_path.with_extension("sav").exists());

    let mut gb = GameBoy::new();
    gb.load_rom(&rom_path).unwrap();
    gb.mmu.write_byte(0x0000, 0x0A);
    assert_eq!(gb.mmu.read_byte(0xA123), 0x77);
}

#[test]
fn restore_errors_surface_to_the_caller() {
    let dir = tempdir().unwrap();
    let rom_path = dir.path().join("game.gb");
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x03;
    rom[0x0149] = 0x03;
    fs::write(&rom_path, &rom).unwrap();

    let mut gb = GameBoy::new();
    gb.load_rom(&rom_path).unwrap();

    let missing = dir.path().join("missing.sav");
    let err = gb.load_state(&missing).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);

    // A file that ends inside the controller region is corruption.
    let truncated = dir.path().join("short.sav");
    fs::write(&truncated, vec![0u8; SAVE_FILE_MBC_OFFSET as usize + 3]).unwrap();
    let err = gb.load_state(&truncated).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}

#[test]
fn save_state_without_a_cartridge_is_an_error() {
    let dir = tempdir().unwrap();
    let gb = GameBoy::new();
    let err = gb.save_state(dir.path().join("empty.sav")).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn boot_overlay_displaces_and_restores_the_low_window() {
    let dir = tempdir().unwrap();
    let rom_path = dir.path().join("boot.gb");

    let mut rom = vec![0u8; 0x8000];
    rom[0x0000] = 0xC3;
    rom[0x0100] = 0x00; // NOP at the post-boot entry point
    fs::write(&rom_path, &rom).unwrap();

    let mut gb = GameBoy::new();
    gb.load_rom(&rom_path).unwrap();
    gb.run_boot();

    assert_eq!(gb.cpu.regs.pc, 0x0000);
    assert_eq!(gb.mmu.read_byte(0x0000), BOOT_ROM[0]);
    assert_eq!(gb.mmu.read_byte(0x00FF), BOOT_ROM[0xFF]);

    // Once execution reaches 0x0100, the facade restores the cartridge bytes.
    gb.cpu.regs.pc = 0x0100;
    gb.step();
    assert_eq!(gb.mmu.read_byte(0x0000), 0xC3);
    assert!(!gb.cart.as_ref().unwrap().boot_mapped());
}

#[test]
fn bootstrap_executes_its_first_instructions() {
    let dir = tempdir().unwrap();
    let rom_path = dir.path().join("boot2.gb");
    fs::write(&rom_path, vec![0u8; 0x8000]).unwrap();

    let mut gb = GameBoy::new();
    gb.load_rom(&rom_path).unwrap();
    gb.run_boot();

    // LD SP,0xFFFE; XOR A; LD HL,0x9FFF
    gb.step();
    assert_eq!(gb.cpu.regs.sp, 0xFFFE);
    gb.step();
    assert_eq!(gb.cpu.regs.a, 0x00);
    gb.step();
    assert_eq!(gb.cpu.regs.hl(), 0x9FFF);
}
