//! Control protocol messages.
//!
//! A request frame is `token[16] ++ opcode ++ payload`, a response frame is
//! `0x00 ++ value` on success or `0xFF ++ error code` on failure.

use ledscene_core::{
    codec::{
        firmware_info_len, pattern_record_len, read_pattern, read_scene, scene_record_len,
        strip_info_len, write_firmware_info, write_pattern, write_scene, write_strip_info, Reader,
        Writer,
    },
    types::{selection_to_byte, FirmwareInfo, Pattern, PatternId, Scene, StripInfo},
    Error, Result, Token, TOKEN_LEN,
};

use crate::Pin;

/// Status byte of a successful response.
pub const STATUS_OK: u8 = 0x00;
/// Status byte of a failed response.
pub const STATUS_ERROR: u8 = 0xFF;

mod opcode {
    pub const GET_BRIGHTNESS: u8 = 0x01;
    pub const SET_BRIGHTNESS: u8 = 0x02;
    pub const SET_TOKEN: u8 = 0x03;
    pub const SET_PIN: u8 = 0x04;
    pub const GET_FIRMWARE_INFO: u8 = 0x05;

    pub const LIST_PATTERNS: u8 = 0x10;
    pub const GET_PATTERN: u8 = 0x11;
    pub const ADD_PATTERN: u8 = 0x12;
    pub const REMOVE_PATTERN: u8 = 0x13;
    pub const UPDATE_PATTERN: u8 = 0x14;

    pub const SCENE_COUNT: u8 = 0x20;
    pub const GET_SCENE: u8 = 0x21;
    pub const ADD_SCENE: u8 = 0x22;
    pub const REMOVE_SCENE: u8 = 0x23;
    pub const UPDATE_SCENE: u8 = 0x24;
    pub const SELECT_SCENE: u8 = 0x25;
    pub const GET_SELECTED_SCENE: u8 = 0x26;

    pub const STRIP_INVENTORY: u8 = 0x30;
}

/// Control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetBrightness,
    SetBrightness(u8),
    SetToken(Token),
    SetPin(Pin),
    GetFirmwareInfo,

    ListPatterns,
    GetPattern(PatternId),
    AddPattern(Pattern),
    RemovePattern(PatternId),
    UpdatePattern(PatternId, Pattern),

    SceneCount,
    GetScene(u8),
    AddScene(Scene),
    RemoveScene(u8),
    UpdateScene(u8, Scene),
    SelectScene(u8),
    GetSelectedScene,

    StripInventory,
}

impl Request {
    pub fn opcode(&self) -> u8 {
        match self {
            Self::GetBrightness => opcode::GET_BRIGHTNESS,
            Self::SetBrightness(_) => opcode::SET_BRIGHTNESS,
            Self::SetToken(_) => opcode::SET_TOKEN,
            Self::SetPin(_) => opcode::SET_PIN,
            Self::GetFirmwareInfo => opcode::GET_FIRMWARE_INFO,
            Self::ListPatterns => opcode::LIST_PATTERNS,
            Self::GetPattern(_) => opcode::GET_PATTERN,
            Self::AddPattern(_) => opcode::ADD_PATTERN,
            Self::RemovePattern(_) => opcode::REMOVE_PATTERN,
            Self::UpdatePattern(..) => opcode::UPDATE_PATTERN,
            Self::SceneCount => opcode::SCENE_COUNT,
            Self::GetScene(_) => opcode::GET_SCENE,
            Self::AddScene(_) => opcode::ADD_SCENE,
            Self::RemoveScene(_) => opcode::REMOVE_SCENE,
            Self::UpdateScene(..) => opcode::UPDATE_SCENE,
            Self::SelectScene(_) => opcode::SELECT_SCENE,
            Self::GetSelectedScene => opcode::GET_SELECTED_SCENE,
            Self::StripInventory => opcode::STRIP_INVENTORY,
        }
    }

    /// Decodes the request body, that is the opcode followed by the payload.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(body);
        let request = match reader.read_u8()? {
            opcode::GET_BRIGHTNESS => Self::GetBrightness,
            opcode::SET_BRIGHTNESS => Self::SetBrightness(reader.read_u8()?),
            opcode::SET_TOKEN => {
                let mut token = Token::default();
                token.copy_from_slice(reader.read_bytes(TOKEN_LEN)?);
                Self::SetToken(token)
            }
            opcode::SET_PIN => {
                let bytes = reader.read_bytes(reader.remaining())?;
                let pin = std::str::from_utf8(bytes).map_err(|_| Error::Malformed)?;
                let mut value = Pin::new();
                value.push_str(pin).map_err(|()| Error::Malformed)?;
                Self::SetPin(value)
            }
            opcode::GET_FIRMWARE_INFO => Self::GetFirmwareInfo,

            opcode::LIST_PATTERNS => Self::ListPatterns,
            opcode::GET_PATTERN => Self::GetPattern(PatternId(reader.read_u16()?)),
            opcode::ADD_PATTERN => Self::AddPattern(read_pattern(&mut reader)?),
            opcode::REMOVE_PATTERN => Self::RemovePattern(PatternId(reader.read_u16()?)),
            opcode::UPDATE_PATTERN => {
                let id = PatternId(reader.read_u16()?);
                Self::UpdatePattern(id, read_pattern(&mut reader)?)
            }

            opcode::SCENE_COUNT => Self::SceneCount,
            opcode::GET_SCENE => Self::GetScene(reader.read_u8()?),
            opcode::ADD_SCENE => Self::AddScene(read_scene(&mut reader)?),
            opcode::REMOVE_SCENE => Self::RemoveScene(reader.read_u8()?),
            opcode::UPDATE_SCENE => {
                let index = reader.read_u8()?;
                Self::UpdateScene(index, read_scene(&mut reader)?)
            }
            opcode::SELECT_SCENE => Self::SelectScene(reader.read_u8()?),
            opcode::GET_SELECTED_SCENE => Self::GetSelectedScene,

            opcode::STRIP_INVENTORY => Self::StripInventory,

            other => {
                log::warn!("Unknown request opcode {other:#04x}");
                return Err(Error::Malformed);
            }
        };
        Ok(request)
    }

    fn payload_len(&self) -> usize {
        match self {
            Self::GetBrightness
            | Self::GetFirmwareInfo
            | Self::ListPatterns
            | Self::SceneCount
            | Self::GetSelectedScene
            | Self::StripInventory => 0,

            Self::SetBrightness(_)
            | Self::GetScene(_)
            | Self::RemoveScene(_)
            | Self::SelectScene(_) => 1,
            Self::SetToken(_) => TOKEN_LEN,
            Self::SetPin(pin) => pin.len(),

            Self::GetPattern(_) | Self::RemovePattern(_) => 2,
            Self::AddPattern(pattern) => pattern_record_len(pattern),
            Self::UpdatePattern(_, pattern) => 2 + pattern_record_len(pattern),

            Self::AddScene(scene) => scene_record_len(scene),
            Self::UpdateScene(_, scene) => 1 + scene_record_len(scene),
        }
    }

    /// Encodes a complete request frame.
    pub fn encode(&self, token: &Token) -> Result<Vec<u8>> {
        let mut frame = vec![0_u8; TOKEN_LEN + 1 + self.payload_len()];
        let mut writer = Writer::new(&mut frame);
        writer.write_bytes(token)?;
        writer.write_u8(self.opcode())?;
        match self {
            Self::GetBrightness
            | Self::GetFirmwareInfo
            | Self::ListPatterns
            | Self::SceneCount
            | Self::GetSelectedScene
            | Self::StripInventory => {}

            Self::SetBrightness(value)
            | Self::GetScene(value)
            | Self::RemoveScene(value)
            | Self::SelectScene(value) => writer.write_u8(*value)?,
            Self::SetToken(new_token) => writer.write_bytes(new_token)?,
            Self::SetPin(pin) => writer.write_bytes(pin.as_bytes())?,

            Self::GetPattern(id) | Self::RemovePattern(id) => writer.write_u16(id.0)?,
            Self::AddPattern(pattern) => write_pattern(&mut writer, pattern)?,
            Self::UpdatePattern(id, pattern) => {
                writer.write_u16(id.0)?;
                write_pattern(&mut writer, pattern)?;
            }

            Self::AddScene(scene) => write_scene(&mut writer, scene)?,
            Self::UpdateScene(index, scene) => {
                writer.write_u8(*index)?;
                write_scene(&mut writer, scene)?;
            }
        }
        Ok(frame)
    }
}

/// Control response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Empty,
    Brightness(u8),
    PatternIds(Vec<PatternId>),
    Pattern(Pattern),
    PatternAdded(PatternId),
    SceneCount(u8),
    Scene(u8, Scene),
    SceneIndex(u8),
    SelectedScene(Option<u8>),
    Strips(Vec<StripInfo>),
    FirmwareInfo(FirmwareInfo),
    Error(Error),
}

impl Response {
    /// Encodes the response frame.
    pub fn encode(&self) -> Vec<u8> {
        self.encode_value().unwrap_or_else(|err| {
            log::error!("Unable to encode response: {err}");
            vec![STATUS_ERROR, err.into_code()]
        })
    }

    fn value_len(&self) -> usize {
        match self {
            Self::Empty | Self::Error(_) => 0,
            Self::Brightness(_)
            | Self::SceneCount(_)
            | Self::SceneIndex(_)
            | Self::SelectedScene(_) => 1,

            Self::PatternIds(ids) => 2 + 2 * ids.len(),
            Self::Pattern(pattern) => pattern_record_len(pattern),
            Self::PatternAdded(_) => 2,
            Self::Scene(_, scene) => 1 + scene_record_len(scene),
            Self::Strips(strips) => 1 + strips.iter().map(strip_info_len).sum::<usize>(),
            Self::FirmwareInfo(info) => firmware_info_len(info),
        }
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        if let Self::Error(err) = self {
            return Ok(vec![STATUS_ERROR, err.into_code()]);
        }

        let mut frame = vec![0_u8; 1 + self.value_len()];
        let mut writer = Writer::new(&mut frame);
        writer.write_u8(STATUS_OK)?;
        match self {
            Self::Empty | Self::Error(_) => {}
            Self::Brightness(value)
            | Self::SceneCount(value)
            | Self::SceneIndex(value) => writer.write_u8(*value)?,
            Self::SelectedScene(selected) => writer.write_u8(selection_to_byte(*selected))?,

            Self::PatternIds(ids) => {
                let count = u16::try_from(ids.len()).map_err(|_| Error::BufferTooSmall)?;
                writer.write_u16(count)?;
                for id in ids {
                    writer.write_u16(id.0)?;
                }
            }
            Self::Pattern(pattern) => write_pattern(&mut writer, pattern)?,
            Self::PatternAdded(id) => writer.write_u16(id.0)?,

            Self::Scene(index, scene) => {
                writer.write_u8(*index)?;
                write_scene(&mut writer, scene)?;
            }

            Self::Strips(strips) => {
                let count = u8::try_from(strips.len()).map_err(|_| Error::BufferTooSmall)?;
                writer.write_u8(count)?;
                for strip in strips {
                    write_strip_info(&mut writer, strip)?;
                }
            }
            Self::FirmwareInfo(info) => write_firmware_info(&mut writer, info)?,
        }
        Ok(frame)
    }
}

impl From<Result<Response>> for Response {
    fn from(result: Result<Response>) -> Self {
        result.unwrap_or_else(Response::Error)
    }
}
