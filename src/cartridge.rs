use std::{fs, io, path::Path};

use crate::mbc::{BankController, Mbc1, Mbc3, Mbc5, RomOnly};
use crate::mmu::Mmu;

// Header offsets consumed by the loader.
const HEADER_TITLE_START: usize = 0x0134;
const HEADER_TITLE_END: usize = 0x0143;
const HEADER_CART_TYPE: usize = 0x0147;
const HEADER_ROM_SIZE: usize = 0x0148;
const HEADER_RAM_SIZE: usize = 0x0149;
const HEADER_END: usize = 0x0150;

/// Bootstrap routine mapped over the first 256 bytes of ROM at power-on,
/// until cartridge code takes over at 0x0100.
pub const BOOT_ROM: [u8; 0x100] = [
    0x31, 0xFE, 0xFF, 0xAF, 0x21, 0xFF, 0x9F, 0x32, 0xCB, 0x7C, 0x20, 0xFB, 0x21, 0x26, 0xFF, 0x0E,
    0x11, 0x3E, 0x80, 0x32, 0xE2, 0x0C, 0x3E, 0xF3, 0xE2, 0x32, 0x3E, 0x77, 0x77, 0x3E, 0xFC, 0xE0,
    0x47, 0x11, 0x04, 0x01, 0x21, 0x10, 0x80, 0x1A, 0xCD, 0x95, 0x00, 0xCD, 0x96, 0x00, 0x13, 0x7B,
    0xFE, 0x34, 0x20, 0xF3, 0x11, 0xD8, 0x00, 0x06, 0x08, 0x1A, 0x13, 0x22, 0x23, 0x05, 0x20, 0xF9,
    0x3E, 0x19, 0xEA, 0x10, 0x99, 0x21, 0x2F, 0x99, 0x0E, 0x0C, 0x3D, 0x28, 0x08, 0x32, 0x0D, 0x20,
    0xF9, 0x2E, 0x0F, 0x18, 0xF3, 0x67, 0x3E, 0x64, 0x57, 0xE0, 0x42, 0x3E, 0x91, 0xE0, 0x40, 0x04,
    0x1E, 0x02, 0x0E, 0x0C, 0xF0, 0x44, 0xFE, 0x90, 0x20, 0xFA, 0x0D, 0x20, 0xF7, 0x1D, 0x20, 0xF2,
    0x0E, 0x13, 0x24, 0x7C, 0x1E, 0x83, 0xFE, 0x62, 0x28, 0x06, 0x1E, 0xC1, 0xFE, 0x64, 0x20, 0x06,
    0x7B, 0xE2, 0x0C, 0x3E, 0x87, 0xE2, 0xF0, 0x42, 0x90, 0xE0, 0x42, 0x15, 0x20, 0xD2, 0x05, 0x20,
    0x4F, 0x16, 0x20, 0x18, 0xCB, 0x4F, 0x06, 0x04, 0xC5, 0xCB, 0x11, 0x17, 0xC1, 0xCB, 0x11, 0x17,
    0x05, 0x20, 0xF5, 0x22, 0x23, 0x22, 0x23, 0xC9, 0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B,
    0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D, 0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E,
    0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99, 0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC,
    0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E, 0x3C, 0x42, 0xB9, 0xA5, 0xB9, 0xA5, 0x42, 0x3C,
    0x21, 0x04, 0x01, 0x11, 0xA8, 0x00, 0x1A, 0x13, 0xBE, 0x00, 0x00, 0x23, 0x7D, 0xFE, 0x34, 0x20,
    0xF5, 0x06, 0x19, 0x78, 0x86, 0x23, 0x05, 0x20, 0xFB, 0x86, 0x00, 0x00, 0x3E, 0x01, 0xE0, 0x50,
];

/// Controller family selected by the header's cartridge-type code. Battery,
/// RAM and timer variants of one family map to the same controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    RomOnly,
    Mbc1,
    Mbc3,
    Mbc5,
}

/// Parsed cartridge metadata plus the bytes the bootstrap overlay displaces.
///
/// Construction is one-shot: [`Cartridge::insert`] parses the header, builds
/// the matching bank controller and installs it into the routing unit.
#[derive(Debug)]
pub struct Cartridge {
    pub title: String,
    pub kind: ControllerKind,
    pub rom_banks: usize,
    pub ram_banks: usize,
    pub has_battery: bool,
    displaced: Option<Box<[u8; 0x100]>>,
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P, mmu: &mut Mmu) -> io::Result<Self> {
        let data = fs::read(path)?;
        Self::insert(data, mmu)
    }

    pub fn insert(data: Vec<u8>, mmu: &mut Mmu) -> io::Result<Self> {
        let header = Header::parse(&data)?;
        let kind = header.controller_kind()?;
        let rom_banks = header.rom_banks()?;
        let ram_banks = header.ram_banks()?;
        let title = header.title();
        let has_battery = header.has_battery();

        log::info!(
            "loaded ROM {title:?} ({kind:?}, {rom_banks} ROM banks, {ram_banks} RAM banks)"
        );

        mmu.load_low_rom(&data);
        let chip: Box<dyn BankController> = match kind {
            ControllerKind::RomOnly => Box::new(RomOnly::new(data, ram_banks)),
            ControllerKind::Mbc1 => Box::new(Mbc1::new(data, rom_banks, ram_banks)),
            ControllerKind::Mbc3 => Box::new(Mbc3::new(data, rom_banks, ram_banks)),
            ControllerKind::Mbc5 => Box::new(Mbc5::new(data, rom_banks, ram_banks)),
        };
        mmu.install_chip(chip);

        Ok(Self {
            title,
            kind,
            rom_banks,
            ram_banks,
            has_battery,
            displaced: None,
        })
    }

    /// Map the bootstrap routine over the low ROM window, parking the
    /// displaced cartridge bytes until [`Cartridge::unload_boot`].
    pub fn load_boot(&mut self, mmu: &mut Mmu) {
        let window = mmu.boot_window_mut();
        let mut displaced = Box::new([0u8; 0x100]);
        displaced.copy_from_slice(window);
        window.copy_from_slice(&BOOT_ROM);
        self.displaced = Some(displaced);
    }

    /// Restore the displaced cartridge bytes. Caller-triggered, typically
    /// once the program counter reaches the post-bootstrap entry point.
    pub fn unload_boot(&mut self, mmu: &mut Mmu) {
        if let Some(displaced) = self.displaced.take() {
            mmu.boot_window_mut().copy_from_slice(&displaced[..]);
        }
    }

    pub fn boot_mapped(&self) -> bool {
        self.displaced.is_some()
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> io::Result<Self> {
        if data.len() < HEADER_END {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "ROM image too small to hold a cartridge header",
            ));
        }
        Ok(Self { data })
    }

    fn title(&self) -> String {
        let mut slice = &self.data[HEADER_TITLE_START..HEADER_TITLE_END];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn cart_type(&self) -> u8 {
        self.data[HEADER_CART_TYPE]
    }

    fn controller_kind(&self) -> io::Result<ControllerKind> {
        match self.cart_type() {
            0x00 | 0x08 | 0x09 => Ok(ControllerKind::RomOnly),
            0x01..=0x03 => Ok(ControllerKind::Mbc1),
            0x0F..=0x13 => Ok(ControllerKind::Mbc3),
            0x19..=0x1E => Ok(ControllerKind::Mbc5),
            code => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported cartridge type {code:#04X}"),
            )),
        }
    }

    fn has_battery(&self) -> bool {
        matches!(self.cart_type(), 0x03 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E)
    }

    fn rom_banks(&self) -> io::Result<usize> {
        match self.data[HEADER_ROM_SIZE] {
            0x00 => Ok(2),
            0x01 => Ok(4),
            0x02 => Ok(8),
            0x03 => Ok(16),
            0x04 => Ok(32),
            0x05 => Ok(64),
            0x06 => Ok(128),
            0x07 => Ok(256),
            0x08 => Ok(512),
            code => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown ROM size code {code:#04X}"),
            )),
        }
    }

    fn ram_banks(&self) -> io::Result<usize> {
        match self.data[HEADER_RAM_SIZE] {
            0x00 => Ok(0),
            // 2KB carts still get one full bank of backing storage.
            0x01 => Ok(1),
            0x02 => Ok(1),
            0x03 => Ok(4),
            0x04 => Ok(16),
            0x05 => Ok(8),
            code => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown RAM size code {code:#04X}"),
            )),
        }
    }
}
