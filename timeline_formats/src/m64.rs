use std::{
    fmt, fs,
    io::{BufWriter, Write},
    path::Path,
};

use timeline_data_path::GlobalDataPath;
use timeline_edits::EditLog;
use timeline_memory::GameMemory;
use timeline_types::Value;

use crate::{buttons::BUTTON_FLAGS, LoadError};

/// SM64 game versions, identified by their movie CRC and country code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SM64Version {
    /// The original Japanese release.
    JP,
    /// US version.
    US,
    /// PAL version.
    EU,
    /// Shindou version.
    SH,
}

impl SM64Version {
    fn crc_code(self) -> u32 {
        match self {
            SM64Version::JP => 0x0e3daa4e,
            SM64Version::US => 0xff2b5a63,
            SM64Version::EU => 0x36f03ca0,
            SM64Version::SH => 0xa8a4fbd6,
        }
    }

    fn country_code(self) -> u8 {
        match self {
            SM64Version::JP => b'J',
            SM64Version::US => b'E',
            SM64Version::EU => b'P',
            SM64Version::SH => b'J',
        }
    }
}

/// Header metadata for a .m64 TAS.
#[derive(Debug, Clone)]
pub struct M64Metadata {
    crc_code: u32,
    country_code: u8,
    author: String,
    description: String,
    rerecords: u32,
}

impl M64Metadata {
    /// Metadata carrying the CRC and country code of a known SM64 version.
    pub fn with_version(version: SM64Version) -> Self {
        Self {
            crc_code: version.crc_code(),
            country_code: version.country_code(),
            author: String::new(),
            description: String::new(),
            rerecords: 0,
        }
    }

    /// The rerecord count.
    pub fn rerecords(&self) -> u32 {
        self.rerecords
    }
}

impl fmt::Display for M64Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M64Metadata(crc_code = {:#010X}, country_code = {:?}, rerecords = {})",
            self.crc_code, self.country_code as char, self.rerecords
        )
    }
}

/// One frame's worth of raw controller input, as encoded in a .m64 file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Input {
    /// The raw 16-bit button flags.
    pub buttons: u16,
    /// The joystick x coordinate.
    pub stick_x: i8,
    /// The joystick y coordinate.
    pub stick_y: i8,
}

const HEADER_SIZE: usize = 0x400;

/// Load an m64 TAS from a file.
pub fn load_m64(filename: &str) -> Result<(M64Metadata, Vec<Input>), LoadError> {
    let f = fs::read(filename)?;
    if f.len() < HEADER_SIZE {
        return Err(LoadError::invalid(f.len(), "file is shorter than the m64 header"));
    }
    if f[0..4] != [0x4d, 0x36, 0x34, 0x1a] {
        return Err(LoadError::invalid(0, "missing m64 magic number"));
    }

    let rerecords = u32::from_le_bytes([f[0x10], f[0x11], f[0x12], f[0x13]]);
    let crc_code = u32::from_le_bytes([f[0xe4], f[0xe5], f[0xe6], f[0xe7]]);
    let country_code = f[0xe8];

    let author = String::from_utf8(f[0x222..0x222 + 222].to_vec())
        .map_err(|_| LoadError::invalid(0x222, "author field is not valid utf-8"))?
        .trim_end_matches('\x00')
        .to_string();

    let description = String::from_utf8(f[0x300..0x300 + 256].to_vec())
        .map_err(|_| LoadError::invalid(0x300, "description field is not valid utf-8"))?
        .trim_end_matches('\x00')
        .to_string();

    let metadata = M64Metadata {
        crc_code,
        country_code,
        author,
        description,
        rerecords,
    };

    let mut inputs = Vec::new();
    for (i, chunk) in f[HEADER_SIZE..].chunks_exact(4).enumerate() {
        if chunk.len() < 4 {
            return Err(LoadError::invalid(HEADER_SIZE + i * 4, "truncated input record"));
        }
        inputs.push(Input {
            buttons: u16::from_be_bytes([chunk[0], chunk[1]]),
            stick_x: chunk[2] as i8,
            stick_y: chunk[3] as i8,
        });
    }

    Ok((metadata, inputs))
}

/// Save an m64 TAS to a file.
pub fn save_m64(filename: &str, metadata: &M64Metadata, inputs: &[Input]) -> Result<(), LoadError> {
    if let Some(dir) = Path::new(filename).parent() {
        fs::create_dir_all(dir)?;
    }
    let mut f = BufWriter::new(fs::File::create(filename)?);

    f.write_all(&[0x4d, 0x36, 0x34, 0x1a])?;
    f.write_all(&[0x03, 0x00, 0x00, 0x00])?;
    f.write_all(&[0x00, 0x00, 0x00, 0x00])?;
    f.write_all(&[0xff, 0xff, 0xff, 0xff])?;
    f.write_all(&metadata.rerecords.to_le_bytes())?;
    f.write_all(&[0x3c])?;
    f.write_all(&[0x01])?;
    f.write_all(&[0x00, 0x00])?;
    f.write_all(&(inputs.len() as u32).to_le_bytes())?;
    f.write_all(&[0x02, 0x00])?;
    f.write_all(&[0x00, 0x00])?;
    f.write_all(&[0x01, 0x00, 0x00, 0x00])?;
    f.write_all(&[0x00; 160])?;

    let mut game_name = b"SUPER MARIO 64".to_vec();
    game_name.resize(32, 0x00);
    f.write_all(&game_name)?;

    f.write_all(&metadata.crc_code.to_le_bytes())?;
    f.write_all(&[metadata.country_code, 0x00])?;
    f.write_all(&[0x00; 56])?;
    f.write_all(&[0x00; 64])?;
    f.write_all(&[0x00; 64])?;
    f.write_all(&[0x00; 64])?;
    f.write_all(&[0x00; 64])?;

    let mut author = metadata.author.as_bytes().to_vec();
    author.resize(222, 0x00);
    f.write_all(&author)?;

    let mut description = metadata.description.as_bytes().to_vec();
    description.resize(256, 0x00);
    f.write_all(&description)?;

    for input in inputs {
        f.write_all(&input.buttons.to_be_bytes())?;
        f.write_all(&[input.stick_x as u8])?;
        f.write_all(&[input.stick_y as u8])?;
    }

    Ok(())
}

/// The compiled data paths an m64 replay writes to.
#[derive(Debug, Clone)]
pub struct M64Paths {
    /// `gControllerPads[0].button`.
    pub buttons: GlobalDataPath,
    /// `gControllerPads[0].stick_x`.
    pub stick_x: GlobalDataPath,
    /// `gControllerPads[0].stick_y`.
    pub stick_y: GlobalDataPath,
}

/// Replay a sequence of m64 inputs into an edit log, one frame per input record.
///
/// Buttons are expanded into individual masked flag writes rather than one flat integer
/// write, so that a single button can later be independently edited.
pub fn replay_m64<M: GameMemory>(inputs: &[Input], paths: &M64Paths, log: &mut EditLog<M>) {
    for (frame, input) in inputs.iter().enumerate() {
        let frame = frame as u32;
        for &(_, flag) in BUTTON_FLAGS {
            log.write_flag(&paths.buttons, frame, flag as u32, input.buttons & flag != 0);
        }
        log.write(&paths.stick_x, frame, Value::Int(input.stick_x as i128));
        log.write(&paths.stick_y, frame, Value::Int(input.stick_y as i128));
    }
}
