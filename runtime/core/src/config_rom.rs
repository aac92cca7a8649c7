// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2022 Takashi Sakamoto

//! Typical data layout of Configuration ROM, used to identify vendor and model of unit.

use {
    super::*,
    ieee1212_config_rom::*,
    std::convert::TryFrom,
};

/// The data in root directory.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RootData {
    pub vendor_id: u32,
    pub vendor_name: String,
    pub model_id: u32,
    pub model_name: String,
}

/// The data in unit directory.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct UnitData {
    pub specifier_id: u32,
    pub version: u32,
    pub model_id: u32,
    pub model_name: String,
}

fn parse_config_rom(raw: &[u8]) -> Result<ConfigRom<'_>, Error> {
    ConfigRom::try_from(raw).map_err(|e| {
        let msg = format!("Malformed configuration ROM detected: {}", e);
        Error::new(ErrorKind::Protocol, &msg)
    })
}

// The value and the name in descriptor leaf which follows to it.
fn detect_desc_text<'a>(entries: &'a [Entry], key_type: KeyType) -> Option<(u32, &'a str)> {
    let mut peekable = entries.iter().peekable();

    while let Some(entry) = peekable.next() {
        let result = EntryDataAccess::<u32>::get(entry, key_type).map(|value| {
            let name = peekable
                .peek()
                .and_then(|&next| EntryDataAccess::<&str>::get(next, KeyType::Descriptor))
                .unwrap_or("");
            (value, name)
        });

        if result.is_some() {
            return result;
        }
    }

    None
}

/// Parse root directory for vendor and model.
pub fn parse_root_data(raw: &[u8]) -> Result<RootData, Error> {
    let config_rom = parse_config_rom(raw)?;

    let (vendor_id, vendor_name) = detect_desc_text(&config_rom.root, KeyType::Vendor)
        .ok_or_else(|| Error::new(ErrorKind::Protocol, "Vendor ID is missing"))?;
    let (model_id, model_name) =
        detect_desc_text(&config_rom.root, KeyType::Model).unwrap_or((0, ""));

    Ok(RootData {
        vendor_id,
        vendor_name: vendor_name.to_string(),
        model_id,
        model_name: model_name.to_string(),
    })
}

/// Parse the first unit directory.
pub fn parse_unit_data(raw: &[u8]) -> Result<UnitData, Error> {
    let config_rom = parse_config_rom(raw)?;

    let entries = config_rom
        .root
        .iter()
        .find_map(|entry| EntryDataAccess::<&[Entry]>::get(entry, KeyType::Unit))
        .ok_or_else(|| Error::new(ErrorKind::Protocol, "Unit directory is missing"))?;

    let specifier_id = entries
        .iter()
        .find_map(|entry| EntryDataAccess::<u32>::get(entry, KeyType::SpecifierId))
        .ok_or_else(|| Error::new(ErrorKind::Protocol, "Specifier ID is missing"))?;

    let version = entries
        .iter()
        .find_map(|entry| EntryDataAccess::<u32>::get(entry, KeyType::Version))
        .ok_or_else(|| Error::new(ErrorKind::Protocol, "Version is missing"))?;

    let (model_id, model_name) = detect_desc_text(entries, KeyType::Model).unwrap_or((0, ""));

    Ok(UnitData {
        specifier_id,
        version,
        model_id,
        model_name: model_name.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    // Bus information block, root directory with vendor and model, and one unit directory.
    pub(crate) const CONFIG_ROM: [u8; 92] = [
        0x04, 0x04, 0x00, 0x00, 0x31, 0x33, 0x39, 0x34, 0xf0, 0x00, 0xb2, 0x23, 0x00, 0x01,
        0xf2, 0x00, 0x00, 0x00, 0x00, 0x01,
        // Root directory: vendor, descriptor, model, descriptor, unit.
        0x00, 0x05, 0x00, 0x00,
        0x03, 0x00, 0x01, 0xf2,
        0x81, 0x00, 0x00, 0x04,
        0x17, 0x00, 0xab, 0xcd,
        0x81, 0x00, 0x00, 0x06,
        0xd1, 0x00, 0x00, 0x09,
        // Leaf of vendor name.
        0x00, 0x03, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        b'M', b'O', b'T', b'U',
        // Leaf of model name.
        0x00, 0x03, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        b'8', b'2', b'8', 0x00,
        // Unit directory: specifier ID, version, model.
        0x00, 0x03, 0x00, 0x00,
        0x12, 0x00, 0x01, 0xf2,
        0x13, 0x00, 0x00, 0x03,
        0x17, 0x10, 0x28, 0x02,
    ];

    #[test]
    fn root_and_unit_data() {
        let root = parse_root_data(&CONFIG_ROM).unwrap();
        assert_eq!(root.vendor_id, 0x0001f2);
        assert_eq!(root.vendor_name, "MOTU");
        assert_eq!(root.model_id, 0x00abcd);
        assert_eq!(root.model_name, "828");

        let unit = parse_unit_data(&CONFIG_ROM).unwrap();
        assert_eq!(unit.specifier_id, 0x0001f2);
        assert_eq!(unit.version, 0x000003);
        assert_eq!(unit.model_id, 0x102802);
        assert_eq!(unit.model_name, "");
    }

    #[test]
    fn malformed() {
        let err = parse_root_data(&CONFIG_ROM[..8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
