//! The fixed opcode and response-code catalogues.
//!
//! Two divergent opcode tables circulate in the wider Blynk-client lineage;
//! this one matches the command set the reference mobile app and hardware
//! libraries actually exchange with the server.

use std::fmt;

/// A command opcode recognised by the core. `Response` (0) is the sentinel
/// used for RESPONSE frames; every other variant carries a command body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Response = 0,
    Register = 1,
    Login = 2,
    Redeem = 3,
    HardwareConnected = 4,
    Ping = 6,
    ActivateDashboard = 7,
    DeactivateDashboard = 8,
    RefreshToken = 9,
    HardwareSync = 16,
    BlynkInternal = 17,
    SetWidgetProperty = 19,
    Hardware = 20,
    CreateDash = 21,
    UpdateDash = 22,
    DeleteDash = 23,
    LoadProfileGzipped = 24,
    AppSync = 25,
    Sharing = 26,
    AddPushToken = 27,
    ExportGraphData = 28,
    GetShareToken = 30,
    RefreshShareToken = 31,
    ShareLogin = 32,
    CreateWidget = 33,
    UpdateWidget = 34,
    DeleteWidget = 35,
    GetEnergy = 36,
    AddEnergy = 37,
    UpdateProjectSettings = 38,
    AssignToken = 39,
    GetServer = 40,
    CreateDevice = 42,
    UpdateDevice = 43,
    DeleteDevice = 44,
    GetDevices = 45,
    CreateTag = 46,
    UpdateTag = 47,
    DeleteTag = 48,
    GetTags = 49,
    MobileGetDevice = 50,
    CreateApp = 55,
    UpdateApp = 56,
    DeleteApp = 57,
    EmailQr = 59,
    GetEnhancedGraphData = 60,
    DeleteEnhancedGraphData = 61,
    GetCloneCode = 62,
    GetProjectByCloneCode = 63,
    HardwareResendFromBluetooth = 65,
    Logout = 66,
    CreateTileTemplate = 67,
    UpdateTileTemplate = 68,
    DeleteTileTemplate = 69,
    GetWidget = 70,
    DeviceOffline = 71,
    OutdatedAppNotification = 72,
    GetProvisionToken = 74,
    DeleteDeviceData = 76,
    CreateReport = 77,
    UpdateReport = 78,
    DeleteReport = 79,
    ExportReport = 80,
    ResetPassword = 81,
}

/// Returned by [`Opcode::try_from`] when the byte is not in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownOpcode(pub u8);

impl fmt::Display for UnknownOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown opcode {:#04x}", self.0)
    }
}
impl std::error::Error for UnknownOpcode {}

impl TryFrom<u8> for Opcode {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        Ok(match byte {
            0 => Response,
            1 => Register,
            2 => Login,
            3 => Redeem,
            4 => HardwareConnected,
            6 => Ping,
            7 => ActivateDashboard,
            8 => DeactivateDashboard,
            9 => RefreshToken,
            16 => HardwareSync,
            17 => BlynkInternal,
            19 => SetWidgetProperty,
            20 => Hardware,
            21 => CreateDash,
            22 => UpdateDash,
            23 => DeleteDash,
            24 => LoadProfileGzipped,
            25 => AppSync,
            26 => Sharing,
            27 => AddPushToken,
            28 => ExportGraphData,
            30 => GetShareToken,
            31 => RefreshShareToken,
            32 => ShareLogin,
            33 => CreateWidget,
            34 => UpdateWidget,
            35 => DeleteWidget,
            36 => GetEnergy,
            37 => AddEnergy,
            38 => UpdateProjectSettings,
            39 => AssignToken,
            40 => GetServer,
            42 => CreateDevice,
            43 => UpdateDevice,
            44 => DeleteDevice,
            45 => GetDevices,
            46 => CreateTag,
            47 => UpdateTag,
            48 => DeleteTag,
            49 => GetTags,
            50 => MobileGetDevice,
            55 => CreateApp,
            56 => UpdateApp,
            57 => DeleteApp,
            59 => EmailQr,
            60 => GetEnhancedGraphData,
            61 => DeleteEnhancedGraphData,
            62 => GetCloneCode,
            63 => GetProjectByCloneCode,
            65 => HardwareResendFromBluetooth,
            66 => Logout,
            67 => CreateTileTemplate,
            68 => UpdateTileTemplate,
            69 => DeleteTileTemplate,
            70 => GetWidget,
            71 => DeviceOffline,
            72 => OutdatedAppNotification,
            74 => GetProvisionToken,
            76 => DeleteDeviceData,
            77 => CreateReport,
            78 => UpdateReport,
            79 => DeleteReport,
            80 => ExportReport,
            81 => ResetPassword,
            other => return Err(UnknownOpcode(other)),
        })
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 { op as u8 }
}

/// A server response status code (carried in RESPONSE frames).
///
/// Any integer not in the known catalogue maps to [`ResponseCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Ok,
    QuotaLimit,
    IllegalCommand,
    UserNotRegistered,
    UserAlreadyRegistered,
    UserNotAuthenticated,
    NotAllowed,
    DeviceNotInNetwork,
    NoActiveDashboard,
    InvalidToken,
    IllegalCommandBody,
    NoData,
    ServerError,
    EnergyLimit,
    FacebookUserLoginWithPass,
    Unknown(i32),
}

impl ResponseCode {
    /// `true` for the success code (200).
    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseCode::Ok)
    }

    /// The numeric wire value for this code.
    pub fn value(&self) -> i32 {
        match self {
            ResponseCode::Ok => 200,
            ResponseCode::QuotaLimit => 1,
            ResponseCode::IllegalCommand => 2,
            ResponseCode::UserNotRegistered => 3,
            ResponseCode::UserAlreadyRegistered => 4,
            ResponseCode::UserNotAuthenticated => 5,
            ResponseCode::NotAllowed => 6,
            ResponseCode::DeviceNotInNetwork => 7,
            ResponseCode::NoActiveDashboard => 8,
            ResponseCode::InvalidToken => 9,
            ResponseCode::IllegalCommandBody => 11,
            ResponseCode::NoData => 17,
            ResponseCode::ServerError => 19,
            ResponseCode::EnergyLimit => 21,
            ResponseCode::FacebookUserLoginWithPass => 22,
            ResponseCode::Unknown(v) => *v,
        }
    }
}

impl From<i32> for ResponseCode {
    fn from(code: i32) -> Self {
        match code {
            200 => ResponseCode::Ok,
            1 => ResponseCode::QuotaLimit,
            2 => ResponseCode::IllegalCommand,
            3 => ResponseCode::UserNotRegistered,
            4 => ResponseCode::UserAlreadyRegistered,
            5 => ResponseCode::UserNotAuthenticated,
            6 => ResponseCode::NotAllowed,
            7 => ResponseCode::DeviceNotInNetwork,
            8 => ResponseCode::NoActiveDashboard,
            9 => ResponseCode::InvalidToken,
            11 => ResponseCode::IllegalCommandBody,
            17 => ResponseCode::NoData,
            19 => ResponseCode::ServerError,
            21 => ResponseCode::EnergyLimit,
            22 => ResponseCode::FacebookUserLoginWithPass,
            other => ResponseCode::Unknown(other),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Unknown(v) => write!(f, "unknown response code {v}"),
            other => write!(f, "{:?} ({})", other, other.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_byte_is_rejected() {
        assert!(Opcode::try_from(5).is_err());
        assert!(Opcode::try_from(200).is_err());
    }

    #[test]
    fn known_bytes_roundtrip() {
        for &b in &[0u8, 1, 2, 6, 20, 24, 66, 81] {
            let op = Opcode::try_from(b).expect("known opcode");
            assert_eq!(u8::from(op), b);
        }
    }

    #[test]
    fn response_code_roundtrip() {
        assert!(ResponseCode::from(200).is_ok());
        assert_eq!(ResponseCode::from(19), ResponseCode::ServerError);
        assert_eq!(ResponseCode::from(1234).value(), 1234);
    }
}
