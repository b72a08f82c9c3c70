//! The hardware micro-protocol: `"vw"/"vr"/"dw"/"dr"/"aw"/"ar"` commands
//! carried inside a HARDWARE-opcode frame body.

/// Which pin namespace a hardware command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Virtual,
    Digital,
    Analog,
}

/// A parsed hardware command.
#[derive(Debug, Clone)]
pub struct HardwareCommand {
    /// `Some(kind)` if this is a write (`vw`/`dw`/`aw`).
    pub write: Option<WriteKind>,
    /// `Some(kind)` if this is a read request (`vr`/`dr`/`ar`).
    pub read: Option<WriteKind>,
    pub pin: u8,
    pub values: Vec<String>,
}

fn kind_from_letter(letter: &str) -> Option<WriteKind> {
    match letter {
        "v" => Some(WriteKind::Virtual),
        "d" => Some(WriteKind::Digital),
        "a" => Some(WriteKind::Analog),
        _ => None,
    }
}

/// Parse a NUL-separated hardware command body, e.g. `b"vw\01\0255"`.
pub fn parse(body: &[u8]) -> Option<HardwareCommand> {
    let text = std::str::from_utf8(body).ok()?;
    let mut fields = text.split('\0');
    let op = fields.next()?;
    let pin: u8 = fields.next()?.parse().ok()?;
    let values: Vec<String> = fields.map(str::to_owned).collect();

    if op.len() != 2 {
        return None;
    }
    let (letter, verb) = op.split_at(1);
    let kind = kind_from_letter(letter)?;

    match verb {
        "w" => Some(HardwareCommand { write: Some(kind), read: None, pin, values }),
        "r" => Some(HardwareCommand { write: None, read: Some(kind), pin, values }),
        _ => None,
    }
}

/// Build a write command body: e.g. `build(Virtual, 1, &["255".into()])`
/// produces `b"vw\01\0255"`.
pub fn build_write(kind: WriteKind, pin: u8, values: &[String]) -> Vec<u8> {
    let letter = match kind {
        WriteKind::Virtual => "v",
        WriteKind::Digital => "d",
        WriteKind::Analog => "a",
    };
    let mut fields = vec![format!("{letter}w"), pin.to_string()];
    fields.extend(values.iter().cloned());
    fields.join("\0").into_bytes()
}

/// Build a read-request command body: e.g. `build_read(Digital, 3)`
/// produces `b"dr\03"`.
pub fn build_read(kind: WriteKind, pin: u8) -> Vec<u8> {
    let letter = match kind {
        WriteKind::Virtual => "v",
        WriteKind::Digital => "d",
        WriteKind::Analog => "a",
    };
    format!("{letter}r\0{pin}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_virtual_write() {
        let cmd = parse(b"vw\01\0255").unwrap();
        assert_eq!(cmd.write, Some(WriteKind::Virtual));
        assert_eq!(cmd.pin, 1);
        assert_eq!(cmd.values, vec!["255".to_string()]);
    }

    #[test]
    fn parses_digital_read_request() {
        let cmd = parse(b"dr\03").unwrap();
        assert_eq!(cmd.read, Some(WriteKind::Digital));
        assert!(cmd.values.is_empty());
    }

    #[test]
    fn build_write_roundtrips_through_parse() {
        let body = build_write(WriteKind::Analog, 5, &["512".to_string()]);
        let cmd = parse(&body).unwrap();
        assert_eq!(cmd.write, Some(WriteKind::Analog));
        assert_eq!(cmd.pin, 5);
        assert_eq!(cmd.values, vec!["512".to_string()]);
    }

    #[test]
    fn rejects_unknown_letter() {
        assert!(parse(b"xw\01\0255").is_none());
    }
}
