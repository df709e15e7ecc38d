//! Nintendo licensee / maker code lookup.
//!
//! Nintendo used two generations of publisher codes: a single-byte "old"
//! code (Game Boy, at 0x014B) and a 2-character ASCII "new" code shared by
//! later Game Boy titles (0x0144), GBA (0xB0) and DS (0x010). When the old
//! byte is 0x33 the new code applies.
//!
//! Sources: Pan Docs (GB), GBATEK (GBA/DS).

/// Look up a publisher name from a 2-character ASCII maker code.
pub(crate) fn maker_code_name(code: &str) -> Option<&'static str> {
    match code {
        "01" => Some("Nintendo"),
        "08" => Some("Capcom"),
        "13" => Some("EA (Electronic Arts)"),
        "18" => Some("Hudson Soft"),
        "20" => Some("Destination Software"),
        "25" => Some("san-x"),
        "28" => Some("Kemco Japan"),
        "29" => Some("seta"),
        "31" => Some("Nintendo"),
        "32" => Some("Bandai"),
        "34" => Some("Konami"),
        "37" => Some("Taito"),
        "38" => Some("Hudson"),
        "39" => Some("Banpresto"),
        "41" => Some("Ubi Soft"),
        "42" => Some("Atlus"),
        "44" => Some("Malibu"),
        "46" => Some("angel"),
        "49" => Some("irem"),
        "50" => Some("Absolute"),
        "51" => Some("Acclaim"),
        "52" => Some("Activision"),
        "53" => Some("American sammy"),
        "54" => Some("Konami"),
        "56" => Some("LJN"),
        "58" => Some("Mattel"),
        "5A" => Some("Mindscape"),
        "60" => Some("Titus"),
        "61" => Some("Virgin"),
        "64" => Some("LucasArts"),
        "67" => Some("Ocean"),
        "69" => Some("EA (Electronic Arts)"),
        "70" => Some("Infogrames"),
        "71" => Some("Interplay"),
        "72" => Some("Broderbund"),
        "78" => Some("THQ"),
        "79" => Some("Accolade"),
        "7F" => Some("Kemco"),
        "80" => Some("misawa"),
        "83" => Some("lozc"),
        "86" => Some("Tokuma Shoten"),
        "87" => Some("Tsukuda Original"),
        "8E" => Some("Ape"),
        "91" => Some("Chunsoft"),
        "92" => Some("Video system"),
        "93" => Some("Ocean/Acclaim"),
        "95" => Some("Varie"),
        "96" => Some("Yonezawa/s'pal"),
        "97" => Some("Kaneko"),
        "99" => Some("Pack in soft"),
        "9B" => Some("Tecmo"),
        "A0" => Some("Telenet"),
        "A1" => Some("Hori Electric"),
        "A4" => Some("Konami"),
        "A7" => Some("Takara"),
        "AF" => Some("Namco"),
        "B0" => Some("acclaim"),
        "B1" => Some("ascii or nexsoft"),
        "B2" => Some("Bandai"),
        "B4" => Some("Square Enix"),
        "BB" => Some("SunSoft"),
        "C0" => Some("Taito"),
        "C3" => Some("Squaresoft"),
        "C5" => Some("Data East"),
        "C6" => Some("Tonkinhouse"),
        "C8" => Some("Koei"),
        "CB" => Some("Vap"),
        "CC" => Some("Use Corporation"),
        "D1" => Some("Sofel"),
        "D2" => Some("Quest"),
        "D9" => Some("Banpresto"),
        "DA" => Some("Tomy"),
        "E2" => Some("Uutaka"),
        "E8" => Some("Asmik"),
        "EA" => Some("King Records"),
        "EB" => Some("Atlus"),
        "F3" => Some("Extreme Entertainment"),
        "FF" => Some("LJN"),
        _ => None,
    }
}

/// Look up a publisher name from an old single-byte Game Boy licensee code.
///
/// Returns `None` for 0x33 (which defers to the new code) and for codes not
/// in the table.
pub(crate) fn old_licensee_name(code: u8) -> Option<&'static str> {
    match code {
        0x01 => Some("Nintendo"),
        0x08 => Some("Capcom"),
        0x09 => Some("hot-b"),
        0x0A => Some("Jaleco"),
        0x0B => Some("Coconuts"),
        0x18 => Some("Hudson Soft"),
        0x19 => Some("ITC Entertainment"),
        0x1A => Some("Yanoman"),
        0x24 => Some("PCM Complete"),
        0x25 => Some("san-x"),
        0x28 => Some("Kotobuki Systems"),
        0x29 => Some("seta"),
        0x30 => Some("Infogrames"),
        0x31 => Some("Nintendo"),
        0x32 => Some("Bandai"),
        0x34 => Some("Konami"),
        0x35 => Some("Hector"),
        0x38 => Some("Capcom"),
        0x39 => Some("Banpresto"),
        0x41 => Some("Ubi Soft"),
        0x42 => Some("Atlus"),
        0x44 => Some("Malibu"),
        0x46 => Some("angel"),
        0x49 => Some("irem"),
        0x4A => Some("Virgin"),
        0x50 => Some("Absolute"),
        0x51 => Some("Acclaim"),
        0x52 => Some("Activision"),
        0x53 => Some("American sammy"),
        0x54 => Some("Gametek"),
        0x56 => Some("LJN"),
        0x57 => Some("Matchbox"),
        0x59 => Some("Milton Bradley"),
        0x60 => Some("Titus"),
        0x61 => Some("Virgin"),
        0x67 => Some("Ocean"),
        0x69 => Some("EA (Electronic Arts)"),
        0x6E => Some("Elite Systems"),
        0x6F => Some("Electro brain"),
        0x70 => Some("Infogrames"),
        0x71 => Some("Interplay"),
        0x72 => Some("Broderbund"),
        0x78 => Some("THQ"),
        0x79 => Some("Accolade"),
        0x7F => Some("Kemco"),
        0x83 => Some("lozc"),
        0x86 => Some("Tokuma Shoten"),
        0x8B => Some("Bullet-Proof Software"),
        0x8C => Some("Vic Tokai"),
        0x91 => Some("Chunsoft"),
        0x92 => Some("Video system"),
        0x95 => Some("Varie"),
        0x96 => Some("Yonezawa/s'pal"),
        0x97 => Some("Kaneko"),
        0x99 => Some("Arc"),
        0x9B => Some("Tecmo"),
        0xA0 => Some("Telenet"),
        0xA1 => Some("Hori Electric"),
        0xA4 => Some("Konami"),
        0xA7 => Some("Takara"),
        0xAF => Some("Namco"),
        0xB0 => Some("acclaim"),
        0xB2 => Some("Bandai"),
        0xB4 => Some("Enix"),
        0xBB => Some("SunSoft"),
        0xC0 => Some("Taito"),
        0xC3 => Some("Squaresoft"),
        0xC5 => Some("Data East"),
        0xC8 => Some("Koei"),
        0xCB => Some("Vap"),
        0xD1 => Some("Sofel"),
        0xD2 => Some("Quest"),
        0xD9 => Some("Banpresto"),
        0xDA => Some("Tomy"),
        0xE8 => Some("Asmik"),
        0xEA => Some("King Records"),
        0xEB => Some("Atlus"),
        0xFF => Some("LJN"),
        _ => None,
    }
}
