//! Synthetic `.dta` fixture builders shared by the integration tests.
#![allow(dead_code)] // each test binary uses a different subset
//!
//! Builds byte-exact files in both container layouts so the decode tests
//! can compare cell-by-cell against known inputs. Writing through the
//! builder and reading through the public API is also what backs the
//! round-trip assertions.

use std::fs;
use std::path::PathBuf;

use dta_reader::VarType;
use tempfile::TempDir;

/// One cell of fixture data, matching its variable's type.
#[derive(Debug, Clone, Copy)]
pub enum Cell {
    Byte(i8),
    Int(i16),
    Long(i32),
    Float(f32),
    Double(f64),
    Str(&'static str),
}

enum VarEntry {
    Typed(String, VarType),
    /// A raw tagged type-code slot, for exercising rejection paths.
    RawCode(String, u16),
}

pub struct DtaFileBuilder {
    version: u8,
    big_endian: bool,
    vars: Vec<VarEntry>,
    data_label: String,
    timestamp: String,
    rows: Vec<Vec<Cell>>,
    nobs_override: Option<u64>,
}

impl DtaFileBuilder {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            big_endian: false,
            vars: Vec::new(),
            data_label: String::new(),
            timestamp: String::new(),
            rows: Vec::new(),
            nobs_override: None,
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn var(mut self, name: &str, ty: VarType) -> Self {
        self.vars.push(VarEntry::Typed(name.to_string(), ty));
        self
    }

    /// Emits `code` verbatim into the tagged type-code section.
    pub fn var_raw_code(mut self, name: &str, code: u16) -> Self {
        self.vars.push(VarEntry::RawCode(name.to_string(), code));
        self
    }

    pub fn data_label(mut self, label: &str) -> Self {
        self.data_label = label.to_string();
        self
    }

    pub fn timestamp(mut self, ts: &str) -> Self {
        self.timestamp = ts.to_string();
        self
    }

    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    /// Overrides the observation count claimed by the header.
    pub fn claimed_nobs(mut self, nobs: u64) -> Self {
        self.nobs_override = Some(nobs);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        if self.version >= 117 {
            self.build_tagged()
        } else {
            self.build_legacy()
        }
    }

    pub fn write_to(&self, dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, self.build()).expect("write fixture");
        path
    }

    fn nobs(&self) -> u64 {
        self.nobs_override.unwrap_or(self.rows.len() as u64)
    }

    fn nvar(&self) -> u16 {
        self.vars.len() as u16
    }

    fn build_legacy(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.version);
        out.push(if self.big_endian { 0x01 } else { 0x02 });
        out.push(0x01); // filetype
        out.push(0x00); // padding
        self.put_u16(&mut out, self.nvar());
        self.put_u32(&mut out, self.nobs() as u32);
        push_nul_padded(&mut out, &self.data_label, 81);
        push_nul_padded(&mut out, &self.timestamp, 18);

        for entry in &self.vars {
            out.push(legacy_type_code(self.typed(entry)));
        }
        for entry in &self.vars {
            push_nul_padded(&mut out, self.name_of(entry), 33);
        }
        // Sort order: 2 bytes per variable plus terminator.
        out.extend(std::iter::repeat(0u8).take(2 * (self.vars.len() + 1)));
        for entry in &self.vars {
            push_nul_padded(&mut out, default_format(self.typed(entry)), 49);
        }
        for _ in &self.vars {
            push_nul_padded(&mut out, "", 33);
        }
        for entry in &self.vars {
            push_nul_padded(&mut out, self.name_of(entry), 81);
        }

        // pandas-style release 114 files carry a 5-byte expansion-field
        // terminator before the data.
        if self.version == 114 {
            out.extend_from_slice(&[0u8; 5]);
        }

        self.push_rows(&mut out);
        out
    }

    fn build_tagged(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"<stata_dta><header><release>");
        out.extend_from_slice(format!("{:03}", self.version).as_bytes());
        out.extend_from_slice(b"</release><byteorder>");
        out.extend_from_slice(if self.big_endian { b"MSF" } else { b"LSF" });
        out.extend_from_slice(b"</byteorder><K>");
        self.put_u16(&mut out, self.nvar());
        out.extend_from_slice(b"</K><N>");
        if self.version >= 118 {
            self.put_u64(&mut out, self.nobs());
        } else {
            self.put_u32(&mut out, self.nobs() as u32);
        }
        out.extend_from_slice(b"</N><label>");
        if self.version >= 118 {
            self.put_u16(&mut out, self.data_label.len() as u16);
            out.extend_from_slice(self.data_label.as_bytes());
        } else {
            push_nul_padded(&mut out, &self.data_label, 81);
        }
        out.extend_from_slice(b"</label><timestamp>");
        push_nul_padded(&mut out, &self.timestamp, 18);
        out.extend_from_slice(b"</timestamp></header>");

        // A map section the reader steps over without consuming.
        out.extend_from_slice(b"<map>");
        out.extend(std::iter::repeat(0u8).take(14 * 8));
        out.extend_from_slice(b"</map>");

        let (name_len, format_len, vlname_len, vlabel_len) = if self.version >= 118 {
            (129, 57, 129, 321)
        } else {
            (33, 49, 33, 81)
        };

        out.extend_from_slice(b"<variable_types>");
        for entry in &self.vars {
            let code = match entry {
                VarEntry::Typed(_, ty) => tagged_type_code(*ty),
                VarEntry::RawCode(_, code) => *code,
            };
            if self.version >= 118 {
                // 2-byte little-endian slots, independent of file order.
                out.extend_from_slice(&code.to_le_bytes());
            } else {
                out.push(code as u8);
            }
        }
        out.extend_from_slice(b"</variable_types>");

        out.extend_from_slice(b"<varnames>");
        for entry in &self.vars {
            push_nul_padded(&mut out, self.name_of(entry), name_len);
        }
        out.extend_from_slice(b"</varnames>");

        out.extend_from_slice(b"<sortlist>");
        out.extend(std::iter::repeat(0u8).take(2 * (self.vars.len() + 1)));
        out.extend_from_slice(b"</sortlist>");

        out.extend_from_slice(b"<formats>");
        for entry in &self.vars {
            let format = match entry {
                VarEntry::Typed(_, ty) => default_format(*ty),
                VarEntry::RawCode(..) => "%9.0g",
            };
            push_nul_padded(&mut out, format, format_len);
        }
        out.extend_from_slice(b"</formats>");

        out.extend_from_slice(b"<value_label_names>");
        for _ in &self.vars {
            push_nul_padded(&mut out, "", vlname_len);
        }
        out.extend_from_slice(b"</value_label_names>");

        out.extend_from_slice(b"<variable_labels>");
        for entry in &self.vars {
            push_nul_padded(&mut out, self.name_of(entry), vlabel_len);
        }
        out.extend_from_slice(b"</variable_labels>");

        out.extend_from_slice(b"<characteristics></characteristics>");

        out.extend_from_slice(b"<data>");
        self.push_rows(&mut out);
        out.extend_from_slice(b"</data>");
        out.extend_from_slice(b"<strls></strls><value_labels></value_labels></stata_dta>");
        out
    }

    fn push_rows(&self, out: &mut Vec<u8>) {
        for row in &self.rows {
            assert_eq!(row.len(), self.vars.len(), "row arity mismatch");
            for (entry, cell) in self.vars.iter().zip(row) {
                self.push_cell(out, self.typed(entry), *cell);
            }
        }
    }

    fn push_cell(&self, out: &mut Vec<u8>, ty: VarType, cell: Cell) {
        match (ty, cell) {
            (VarType::Str(w), Cell::Str(s)) => push_nul_padded(out, s, w as usize),
            (VarType::Byte, Cell::Byte(v)) => out.push(v as u8),
            (VarType::Int, Cell::Int(v)) => self.put_u16(out, v as u16),
            (VarType::Long, Cell::Long(v)) => self.put_u32(out, v as u32),
            (VarType::Float, Cell::Float(v)) => self.put_u32(out, v.to_bits()),
            (VarType::Double, Cell::Double(v)) => self.put_u64(out, v.to_bits()),
            (ty, cell) => panic!("cell {:?} does not fit variable type {:?}", cell, ty),
        }
    }

    fn typed(&self, entry: &VarEntry) -> VarType {
        match entry {
            VarEntry::Typed(_, ty) => *ty,
            VarEntry::RawCode(..) => panic!("raw-code variables carry no data"),
        }
    }

    fn name_of<'a>(&self, entry: &'a VarEntry) -> &'a str {
        match entry {
            VarEntry::Typed(name, _) | VarEntry::RawCode(name, _) => name,
        }
    }

    fn put_u16(&self, out: &mut Vec<u8>, v: u16) {
        if self.big_endian {
            out.extend_from_slice(&v.to_be_bytes());
        } else {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn put_u32(&self, out: &mut Vec<u8>, v: u32) {
        if self.big_endian {
            out.extend_from_slice(&v.to_be_bytes());
        } else {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn put_u64(&self, out: &mut Vec<u8>, v: u64) {
        if self.big_endian {
            out.extend_from_slice(&v.to_be_bytes());
        } else {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
}

fn legacy_type_code(ty: VarType) -> u8 {
    match ty {
        VarType::Str(w) => w,
        VarType::Byte => b'b',
        VarType::Int => b'i',
        VarType::Long => b'l',
        VarType::Float => b'f',
        VarType::Double => b'd',
    }
}

fn tagged_type_code(ty: VarType) -> u16 {
    match ty {
        VarType::Str(w) => w as u16,
        VarType::Byte => 251,
        VarType::Int => 252,
        VarType::Long => 253,
        VarType::Float => 254,
        VarType::Double => 255,
    }
}

fn default_format(ty: VarType) -> &'static str {
    match ty {
        VarType::Str(_) => "%10s",
        _ => "%9.0g",
    }
}

fn push_nul_padded(out: &mut Vec<u8>, text: &str, width: usize) {
    let bytes = text.as_bytes();
    assert!(bytes.len() <= width, "field {:?} wider than {}", text, width);
    out.extend_from_slice(bytes);
    out.extend(std::iter::repeat(0u8).take(width - bytes.len()));
}

/// Writes raw bytes as a fixture file.
pub fn write_bytes(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("write fixture");
    path
}
