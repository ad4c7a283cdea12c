//! Builders for synthetic BIFF workbooks.

#![allow(dead_code)]

use std::io::{Cursor, Write};

pub const BOF: u16 = 0x0809;
pub const EOF: u16 = 0x000A;
pub const CODEPAGE: u16 = 0x0042;
pub const DATEMODE: u16 = 0x0022;
pub const XF: u16 = 0x00E0;
pub const FORMAT: u16 = 0x041E;
pub const BOUNDSHEET: u16 = 0x0085;
pub const SST: u16 = 0x00FC;
pub const CONTINUE: u16 = 0x003C;
pub const NUMBER: u16 = 0x0203;
pub const RK: u16 = 0x027E;
pub const MULRK: u16 = 0x00BD;
pub const LABELSST: u16 = 0x00FD;
pub const LABEL: u16 = 0x0204;
pub const FORMULA: u16 = 0x0006;
pub const STRING: u16 = 0x0207;
pub const WINDOW2: u16 = 0x023E;
pub const HYPERLINK: u16 = 0x01B8;

pub const BIFF8: u16 = 0x0600;
pub const BIFF5: u16 = 0x0500;

pub fn words(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// One sheet of a fixture workbook.
pub struct SheetFixture {
    pub name: Vec<u8>,
    pub visibility: u8,
    pub records: Vec<(u16, Vec<u8>)>,
}

impl SheetFixture {
    pub fn new(name: &str) -> Self {
        SheetFixture {
            name: name.as_bytes().to_vec(),
            visibility: 0,
            records: Vec::new(),
        }
    }

    /// Sheet whose name is already encoded (legacy codepage bytes).
    pub fn with_raw_name(name: &[u8]) -> Self {
        SheetFixture {
            name: name.to_vec(),
            visibility: 0,
            records: Vec::new(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visibility = 1;
        self
    }

    pub fn record(mut self, id: u16, payload: Vec<u8>) -> Self {
        self.records.push((id, payload));
        self
    }
}

/// A workbook stream: globals records, then one substream per sheet.
pub struct BookFixture {
    pub version: u16,
    pub globals: Vec<(u16, Vec<u8>)>,
    pub sheets: Vec<SheetFixture>,
}

impl BookFixture {
    pub fn biff8() -> Self {
        BookFixture {
            version: BIFF8,
            globals: vec![(CODEPAGE, words(&[1200])), (XF, xf8(0)), (XF, xf8(14))],
            sheets: Vec::new(),
        }
    }

    pub fn biff5(codepage: u16) -> Self {
        BookFixture {
            version: BIFF5,
            globals: vec![(CODEPAGE, words(&[codepage])), (XF, xf5(0))],
            sheets: Vec::new(),
        }
    }

    pub fn global(mut self, id: u16, payload: Vec<u8>) -> Self {
        self.globals.push((id, payload));
        self
    }

    pub fn sheet(mut self, sheet: SheetFixture) -> Self {
        self.sheets.push(sheet);
        self
    }

    fn legacy(&self) -> bool {
        self.version != BIFF8
    }

    /// Serialize the workbook stream, patching sheet offsets.
    pub fn stream(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push(&mut out, BOF, &bof(self.version, 0x0005));
        for (id, payload) in &self.globals {
            push(&mut out, *id, payload);
        }
        let mut offset_slots = Vec::new();
        for sheet in &self.sheets {
            let mut payload = vec![0, 0, 0, 0, sheet.visibility, 0, sheet.name.len() as u8];
            if !self.legacy() {
                payload.push(0);
            }
            payload.extend_from_slice(&sheet.name);
            offset_slots.push(out.len() + 4);
            push(&mut out, BOUNDSHEET, &payload);
        }
        push(&mut out, EOF, &[]);

        for (sheet, slot) in self.sheets.iter().zip(offset_slots) {
            let offset = out.len() as u32;
            out[slot..slot + 4].copy_from_slice(&offset.to_le_bytes());
            push(&mut out, BOF, &bof(self.version, 0x0010));
            for (id, payload) in &sheet.records {
                push(&mut out, *id, payload);
            }
            push(&mut out, EOF, &[]);
        }
        out
    }

    /// The stream wrapped in a compound document.
    pub fn compound(&self) -> Vec<u8> {
        let name = if self.legacy() { "Book" } else { "Workbook" };
        compound_with(&[(name, self.stream())])
    }
}

pub fn push(out: &mut Vec<u8>, id: u16, payload: &[u8]) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);
}

pub fn compound_with(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut comp = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    for (name, bytes) in streams {
        let mut stream = comp.create_stream(format!("/{name}")).unwrap();
        stream.write_all(bytes).unwrap();
    }
    comp.flush().unwrap();
    comp.into_inner().into_inner()
}

pub fn bof(version: u16, kind: u16) -> Vec<u8> {
    let mut p = words(&[version, kind]);
    p.extend_from_slice(&[0u8; 12]);
    p
}

/// BIFF8 XF record applying `format_id`.
pub fn xf8(format_id: u16) -> Vec<u8> {
    let mut p = words(&[0, format_id, 0x0001]);
    p.extend_from_slice(&[0u8; 14]);
    p
}

/// BIFF5 XF record applying `format_id`.
pub fn xf5(format_id: u16) -> Vec<u8> {
    let mut p = words(&[0, format_id, 0x0001]);
    p.extend_from_slice(&[0u8; 10]);
    p
}

pub fn format8(id: u16, code: &str) -> Vec<u8> {
    let mut p = words(&[id, code.len() as u16]);
    p.push(0);
    p.extend_from_slice(code.as_bytes());
    p
}

/// Compressed BIFF8 string with a 16-bit count.
pub fn string8(text: &str) -> Vec<u8> {
    let mut p = words(&[text.len() as u16]);
    p.push(0);
    p.extend_from_slice(text.as_bytes());
    p
}

/// SST payload holding `strings` in full.
pub fn sst(strings: &[&str]) -> Vec<u8> {
    let mut p = (strings.len() as u32).to_le_bytes().to_vec();
    p.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for s in strings {
        p.extend(string8(s));
    }
    p
}

pub fn number(row: u16, col: u16, style: u16, value: f64) -> Vec<u8> {
    let mut p = words(&[row, col, style]);
    p.extend_from_slice(&value.to_le_bytes());
    p
}

pub fn rk_int(value: i32) -> u32 {
    ((value << 2) as u32) | 0x02
}

pub fn rk(row: u16, col: u16, style: u16, value: i32) -> Vec<u8> {
    let mut p = words(&[row, col, style]);
    p.extend_from_slice(&rk_int(value).to_le_bytes());
    p
}

pub fn mulrk(row: u16, first_col: u16, values: &[i32]) -> Vec<u8> {
    let mut p = words(&[row, first_col]);
    for v in values {
        p.extend_from_slice(&0u16.to_le_bytes());
        p.extend_from_slice(&rk_int(*v).to_le_bytes());
    }
    p.extend_from_slice(&(first_col + values.len() as u16 - 1).to_le_bytes());
    p
}

pub fn labelsst(row: u16, col: u16, index: u32) -> Vec<u8> {
    let mut p = words(&[row, col, 0]);
    p.extend_from_slice(&index.to_le_bytes());
    p
}

/// LABEL record; `text` is already encoded for the workbook's era.
pub fn label(row: u16, col: u16, text: &[u8], biff8: bool) -> Vec<u8> {
    let mut p = words(&[row, col, 0, text.len() as u16]);
    if biff8 {
        p.push(0);
    }
    p.extend_from_slice(text);
    p
}

pub fn formula(row: u16, col: u16, cached: [u8; 8]) -> Vec<u8> {
    let mut p = words(&[row, col, 0]);
    p.extend_from_slice(&cached);
    p.extend_from_slice(&[0u8; 6]);
    // ptgInt 1
    p.extend_from_slice(&[0x03, 0x00, 0x1E, 0x01, 0x00]);
    p
}

pub fn window2(flags: u16) -> Vec<u8> {
    let mut p = words(&[flags]);
    p.extend_from_slice(&[0u8; 16]);
    p
}

fn utf16z(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// HYPERLINK payload for a URL link with a description.
pub fn url_link(rows: (u16, u16), col: u16, description: &str, url: &str) -> Vec<u8> {
    let mut p = words(&[rows.0, rows.1, col, col]);
    p.extend_from_slice(&[0u8; 16]);
    p.extend_from_slice(&2u32.to_le_bytes());
    p.extend_from_slice(&0x17u32.to_le_bytes());
    p.extend_from_slice(&((description.encode_utf16().count() + 1) as u32).to_le_bytes());
    p.extend(utf16z(description));
    p.extend_from_slice(&0xE0C9_EA79_F9BA_CE11u64.to_be_bytes());
    p.extend_from_slice(&0x8C82_00AA_004B_A90Bu64.to_be_bytes());
    let body = utf16z(url);
    p.extend_from_slice(&(body.len() as u32).to_le_bytes());
    p.extend(body);
    p
}
