use std::{
    fs::File,
    io::{self, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use crate::{cartridge::Cartridge, cpu::Cpu, mmu::Mmu};

/// Offset of the bank-controller region inside a save file. Bytes before it
/// are reserved for collaborator state (work/video RAM, register dump,
/// interrupt master flag) and are left zero by this core.
pub const SAVE_FILE_MBC_OFFSET: u64 = 0x800C;

/// High-level facade that wires the CPU and MMU into a single machine.
pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    pub cart: Option<Cartridge>,
    save_path: Option<PathBuf>,
}

impl GameBoy {
    /// Machine starting in cartridge code with post-boot register state.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
            cart: None,
            save_path: None,
        }
    }

    /// Load a ROM image and install its bank controller. Battery-backed
    /// cartridges adopt a save file next to the ROM and restore it if
    /// present.
    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let cart = Cartridge::from_file(path, &mut self.mmu)?;
        let battery = cart.has_battery;
        self.cart = Some(cart);
        self.save_path = None;
        if battery {
            let save = path.with_extension("sav");
            if save.exists() {
                self.load_state(&save)?;
            }
            self.save_path = Some(save);
        }
        Ok(())
    }

    /// Write battery-backed state to the save file adopted at load time.
    /// A no-op for cartridges without a battery.
    pub fn save_battery(&self) -> io::Result<()> {
        match &self.save_path {
            Some(path) => self.save_state(path),
            None => Ok(()),
        }
    }

    /// Map the bootstrap overlay and rewind the CPU to execute it from
    /// address 0.
    pub fn run_boot(&mut self) {
        if let Some(cart) = self.cart.as_mut() {
            cart.load_boot(&mut self.mmu);
            self.cpu = Cpu::new_power_on();
        }
    }

    /// Execute one instruction. Once the program counter leaves the
    /// bootstrap region, the displaced cartridge bytes are restored.
    pub fn step(&mut self) {
        self.cpu.step(&mut self.mmu);
        if let Some(cart) = self.cart.as_mut()
            && cart.boot_mapped()
            && self.cpu.regs.pc >= 0x0100
        {
            cart.unload_boot(&mut self.mmu);
        }
    }

    /// Reset the CPU to its post-boot state while preserving the loaded
    /// cartridge and memory contents.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
    }

    /// Persist the bank controller's state at its fixed save-file offset.
    pub fn save_state<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let Some(chip) = self.mmu.chip() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no cartridge installed",
            ));
        };
        let mut file = File::create(path)?;
        file.seek(SeekFrom::Start(SAVE_FILE_MBC_OFFSET))?;
        chip.save_state(&mut file)
    }

    /// Restore the bank controller's state from its fixed save-file offset.
    pub fn load_state<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(SAVE_FILE_MBC_OFFSET))?;
        let Some(chip) = self.mmu.chip_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no cartridge installed",
            ));
        };
        chip.load_state(&mut file)
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
