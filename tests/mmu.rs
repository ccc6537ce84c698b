use dotmatrix_core::{cartridge::Cartridge, mbc::ROM_BANK_SIZE, mmu::Mmu};

/// MBC1 image with a deterministic byte pattern across all banks.
fn patterned_mbc1_rom(banks: usize) -> Vec<u8> {
    let mut rom: Vec<u8> = (0..banks * ROM_BANK_SIZE)
        .map(|i| (i.wrapping_mul(7).wrapping_add(13) % 256) as u8)
        .collect();
    rom[0x0147] = 0x01; // MBC1
    rom[0x0148] = 0x02; // 8 banks
    rom[0x0149] = 0x00;
    rom
}

#[test]
fn switchable_window_reads_match_the_selected_bank() {
    let rom = patterned_mbc1_rom(8);
    let expected = rom.clone();
    let mut mmu = Mmu::new();
    Cartridge::insert(rom, &mut mmu).unwrap();

    for bank in 1..8usize {
        mmu.write_byte(0x2000, bank as u8);
        for addr in [0x4000u16, 0x4001, 0x5ABC, 0x7FFF] {
            assert_eq!(
                mmu.read_byte(addr),
                expected[bank * ROM_BANK_SIZE + (addr as usize - 0x4000)],
                "bank {bank} addr {addr:#06X}"
            );
        }
    }
}

#[test]
fn low_window_always_maps_bank_zero() {
    let rom = patterned_mbc1_rom(8);
    let expected = rom.clone();
    let mut mmu = Mmu::new();
    Cartridge::insert(rom, &mut mmu).unwrap();

    mmu.write_byte(0x2000, 0x05);
    for addr in [0x0000u16, 0x0150, 0x3FFF] {
        assert_eq!(mmu.read_byte(addr), expected[addr as usize]);
    }
}

#[test]
fn banked_windows_read_open_bus_without_a_cartridge() {
    let mmu = Mmu::new();
    assert_eq!(mmu.read_byte(0x4000), 0xFF);
    assert_eq!(mmu.read_byte(0x7FFF), 0xFF);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
}

#[test]
fn flat_regions_are_plain_storage() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xC000, 0xAA);
    assert_eq!(mmu.read_byte(0xC000), 0xAA);

    // Video and I/O regions are stubbed as storage in this core.
    mmu.write_byte(0x8000, 0x55);
    assert_eq!(mmu.read_byte(0x8000), 0x55);
    mmu.write_byte(0xFF40, 0x91);
    assert_eq!(mmu.read_byte(0xFF40), 0x91);
    mmu.write_byte(0xFFFF, 0x1F);
    assert_eq!(mmu.read_byte(0xFFFF), 0x1F);
}

#[test]
fn rom_region_writes_do_not_hit_flat_storage() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0x1234, 0x99);
    assert_eq!(mmu.read_byte(0x1234), 0x00);
}

#[test]
fn word_access_is_little_endian() {
    let mut mmu = Mmu::new();
    mmu.write_word(0xC100, 0x1234);
    assert_eq!(mmu.read_byte(0xC100), 0x34);
    assert_eq!(mmu.read_byte(0xC101), 0x12);
    assert_eq!(mmu.read_word(0xC100), 0x1234);
}

#[test]
fn ram_enable_gates_the_external_window() {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x03; // MBC1 + RAM + Battery
    rom[0x0149] = 0x03; // 4 banks
    let mut mmu = Mmu::new();
    Cartridge::insert(rom, &mut mmu).unwrap();

    mmu.write_byte(0xA000, 0x55);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);

    mmu.write_byte(0x0000, 0x0A); // enable RAM
    mmu.write_byte(0xA000, 0x55);
    assert_eq!(mmu.read_byte(0xA000), 0x55);

    mmu.write_byte(0x0000, 0x00); // disable RAM
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
}
