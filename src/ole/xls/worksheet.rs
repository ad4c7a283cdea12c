//! Worksheet substreams
//!
//! A [`WorkSheet`] starts as a directory entry read from a BOUNDSHEET record
//! and is filled in on first access by decoding the records at its offset.
//! Cells are attributed to rows as they are decoded; [`SheetRef`] and
//! [`RowRef`] then render them through the workbook's global tables.

use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::sync::Arc;

use crate::ole::xls::cell::{CachedResult, CellContent};
use crate::ole::xls::error::{RecordContext, XlsError, XlsResult};
use crate::ole::xls::hyperlink::HyperLink;
use crate::ole::xls::records::{
    BoundSheetHeader, RecordStream, RowHeader, SheetType, SheetVisibility, WindowOptions, record_ids,
};
use crate::ole::xls::strings::StringDecoder;
use crate::ole::xls::workbook::WorkbookGlobals;
use crate::sheet::types::CellValue;

/// One row of a sheet.
#[derive(Debug, Clone, Default)]
pub struct Row {
    index: u16,
    /// Occupied columns, inclusive; only ever widened
    bounds: Option<(u16, u16)>,
    height: u16,
    flags: u32,
    cells: BTreeMap<u16, CellContent>,
    links: BTreeMap<u16, Arc<HyperLink>>,
}

impl Row {
    fn new(index: u16) -> Self {
        Row {
            index,
            ..Default::default()
        }
    }

    fn widen(&mut self, first: u16, last: u16) {
        self.bounds = Some(match self.bounds {
            Some((lo, hi)) => (lo.min(first), hi.max(last)),
            None => (first, last),
        });
    }

    fn apply_header(&mut self, header: &RowHeader) {
        self.height = header.height;
        self.flags = header.flags;
        if let Some((first, last)) = header.column_span() {
            self.widen(first, last);
        }
    }

    /// Attribute one decoded cell. Runs are split into one cell per column;
    /// landing on an occupied column is an error.
    fn insert(&mut self, content: CellContent) -> XlsResult<()> {
        self.widen(content.first_col(), content.last_col());
        if content.is_run() && content.first_col() != content.last_col() {
            for cell in content.expand() {
                self.insert_single(cell)?;
            }
            Ok(())
        } else {
            self.insert_single(content)
        }
    }

    fn insert_single(&mut self, content: CellContent) -> XlsResult<()> {
        let col = content.first_col();
        if self.cells.contains_key(&col) {
            return Err(XlsError::UnexpectedRecordSequence(format!(
                "row {} column {} already holds a cell",
                self.index, col
            )));
        }
        self.cells.insert(col, content);
        Ok(())
    }

    /// Cell whose span includes `col`.
    fn covering(&self, col: u16) -> Option<&CellContent> {
        self.cells
            .range(..=col)
            .next_back()
            .map(|(_, cell)| cell)
            .filter(|cell| cell.covers(col))
    }

    fn covering_link(&self, col: u16) -> Option<&Arc<HyperLink>> {
        self.links
            .range(..=col)
            .rev()
            .map(|(_, link)| link)
            .find(|link| link.range.contains_col(col))
    }
}

/// A sheet from the workbook directory.
#[derive(Debug, Clone)]
pub struct WorkSheet {
    name: String,
    offset: u32,
    visibility: SheetVisibility,
    sheet_type: SheetType,
    selected: bool,
    right_to_left: bool,
    rows: BTreeMap<u16, Row>,
    max_row: Option<u16>,
    parsed: bool,
}

/// What the previous cell record produced, for pairing STRING with FORMULA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastContent {
    None,
    Formula { row: u16, col: u16, style: u16 },
    Other,
}

impl WorkSheet {
    pub(crate) fn new(name: String, header: BoundSheetHeader) -> Self {
        WorkSheet {
            name,
            offset: header.offset,
            visibility: header.visibility,
            sheet_type: header.sheet_type,
            selected: false,
            right_to_left: false,
            rows: BTreeMap::new(),
            max_row: None,
            parsed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn visibility(&self) -> SheetVisibility {
        self.visibility
    }

    pub fn sheet_type(&self) -> SheetType {
        self.sheet_type
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    fn row_mut(&mut self, index: u16) -> &mut Row {
        self.max_row = Some(self.max_row.map_or(index, |m| m.max(index)));
        self.rows.entry(index).or_insert_with(|| Row::new(index))
    }

    fn add_cell(&mut self, content: CellContent) -> XlsResult<()> {
        self.row_mut(content.row()).insert(content)
    }

    fn add_link(&mut self, link: HyperLink) {
        let link = Arc::new(link);
        for index in link.range.first_row..=link.range.last_row {
            self.row_mut(index)
                .links
                .insert(link.range.first_col, Arc::clone(&link));
        }
    }

    /// Decode the sheet substream once. A failed parse leaves no rows behind
    /// and is retried on the next access.
    pub(crate) fn parse<R: Read + Seek>(
        &mut self,
        records: &mut RecordStream<R>,
        strings: &mut StringDecoder,
    ) -> XlsResult<()> {
        if self.parsed {
            return Ok(());
        }
        if let Err(e) = self.decode(records, strings) {
            self.rows.clear();
            self.max_row = None;
            return Err(e);
        }
        self.parsed = true;
        log::debug!(
            "parsed sheet '{}': {} rows, max row {:?}",
            self.name,
            self.rows.len(),
            self.max_row
        );
        Ok(())
    }

    fn decode<R: Read + Seek>(&mut self, records: &mut RecordStream<R>, strings: &mut StringDecoder) -> XlsResult<()> {
        records.seek(u64::from(self.offset))?;
        strings.clear_pending();

        let mut depth = 0usize;
        let mut last = LastContent::None;

        while let Some(record) = records.next_record()? {
            match record.id {
                record_ids::BOF => {
                    depth += 1;
                    continue;
                },
                record_ids::EOF => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                    continue;
                },
                // embedded chart substream
                _ if depth > 1 => continue,
                _ => {},
            }

            // a pending string result only survives the formula side tables
            let previous = last;
            if !matches!(record.id, record_ids::SHRFMLA | record_ids::ARRAY | record_ids::TABLE) {
                last = LastContent::Other;
            }

            match record.id {
                record_ids::WINDOW2 => {
                    let options = WindowOptions::parse(&record.payload)?;
                    self.selected = options.is_selected();
                    self.right_to_left = options.is_right_to_left();
                },
                record_ids::ROW => {
                    let header = RowHeader::parse(&record.payload)?;
                    self.row_mut(header.index).apply_header(&header);
                },
                record_ids::STRING => {
                    let LastContent::Formula { row, col, style } = previous else {
                        return Err(XlsError::UnexpectedRecordSequence(format!(
                            "STRING record in sheet '{}' does not follow a formula",
                            self.name
                        )));
                    };
                    let text = strings
                        .read_long(&mut record.cursor(), true)
                        .in_record(record_ids::STRING)?;
                    // replaces the formula cell at the same address
                    self.row_mut(row).cells.insert(
                        col,
                        CellContent::FormulaStringResult { row, col, style, text },
                    );
                },
                record_ids::HYPERLINK => match HyperLink::parse(&record.payload, strings) {
                    Ok(link) => self.add_link(link),
                    Err(e) => log::warn!("skipping hyperlink in sheet '{}': {}", self.name, e),
                },
                record_ids::CONTINUE => {
                    log::debug!("ignoring CONTINUE record in sheet '{}'", self.name);
                },
                _ => {
                    if let Some(content) = CellContent::from_record(&record, strings)? {
                        if let CellContent::FormulaResult { row, col, style, cached, .. } = content {
                            if CachedResult::decode(cached) == CachedResult::String {
                                last = LastContent::Formula { row, col, style };
                            }
                        }
                        self.add_cell(content)?;
                    }
                },
            }
        }
        Ok(())
    }
}

/// A parsed sheet together with the workbook tables its cells render through.
#[derive(Debug, Clone, Copy)]
pub struct SheetRef<'a> {
    sheet: &'a WorkSheet,
    globals: &'a WorkbookGlobals,
}

impl<'a> SheetRef<'a> {
    pub(crate) fn new(sheet: &'a WorkSheet, globals: &'a WorkbookGlobals) -> Self {
        SheetRef { sheet, globals }
    }

    pub fn name(&self) -> &'a str {
        &self.sheet.name
    }

    pub fn visibility(&self) -> SheetVisibility {
        self.sheet.visibility
    }

    pub fn sheet_type(&self) -> SheetType {
        self.sheet.sheet_type
    }

    pub fn is_selected(&self) -> bool {
        self.sheet.selected
    }

    pub fn is_right_to_left(&self) -> bool {
        self.sheet.right_to_left
    }

    /// Highest row index holding a row record, cell or link.
    pub fn max_row(&self) -> Option<u16> {
        self.sheet.max_row
    }

    pub fn row(&self, index: u16) -> Option<RowRef<'a>> {
        let globals = self.globals;
        self.sheet.rows.get(&index).map(|row| RowRef { row, globals })
    }

    /// Rows that exist, in index order.
    pub fn rows(self) -> impl Iterator<Item = RowRef<'a>> + 'a {
        let globals = self.globals;
        self.sheet.rows.values().map(move |row| RowRef { row, globals })
    }

    /// Every distinct hyperlink of the sheet, in row order.
    pub fn hyperlinks(&self) -> Vec<Arc<HyperLink>> {
        let mut links: Vec<Arc<HyperLink>> = Vec::new();
        for link in self.sheet.rows.values().flat_map(|row| row.links.values()) {
            if !links.iter().any(|seen| Arc::ptr_eq(seen, link)) {
                links.push(Arc::clone(link));
            }
        }
        links
    }

    /// Rendered text of every row up to `max_row`; missing rows are empty.
    pub fn texts(&self, limit: usize) -> Vec<Vec<String>> {
        let count = self.sheet.max_row.map_or(0, |m| m as usize + 1).min(limit);
        (0..count)
            .map(|i| self.row(i as u16).map(|row| row.texts()).unwrap_or_default())
            .collect()
    }
}

/// One row of a [`SheetRef`].
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    row: &'a Row,
    globals: &'a WorkbookGlobals,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> u16 {
        self.row.index
    }

    pub fn first_col(&self) -> Option<u16> {
        self.row.bounds.map(|(first, _)| first)
    }

    pub fn last_col(&self) -> Option<u16> {
        self.row.bounds.map(|(_, last)| last)
    }

    /// Row height in twips, from the ROW record.
    pub fn height(&self) -> u16 {
        self.row.height
    }

    pub fn flags(&self) -> u32 {
        self.row.flags
    }

    /// Text of column `col`: the cell covering it, else the text of a link
    /// covering it, else empty.
    pub fn cell_text(&self, col: u16) -> String {
        if let Some(cell) = self.row.covering(col) {
            return cell.render_at(self.globals, (col - cell.first_col()) as usize);
        }
        self.row
            .covering_link(col)
            .map(|link| link.display_text())
            .unwrap_or_default()
    }

    /// Text of the cell stored at exactly `col`, empty when there is none.
    pub fn cell_text_exact(&self, col: u16) -> String {
        self.row
            .cells
            .get(&col)
            .map(|cell| cell.render_at(self.globals, 0))
            .unwrap_or_default()
    }

    pub fn cell_value(&self, col: u16) -> CellValue {
        self.row
            .covering(col)
            .map(|cell| cell.value_at(self.globals, (col - cell.first_col()) as usize))
            .unwrap_or_default()
    }

    pub fn cell(&self, col: u16) -> Option<&'a CellContent> {
        self.row.cells.get(&col)
    }

    pub fn cells(self) -> impl Iterator<Item = &'a CellContent> + 'a {
        self.row.cells.values()
    }

    pub fn hyperlink(&self, col: u16) -> Option<&'a HyperLink> {
        self.row.covering_link(col).map(|link| link.as_ref())
    }

    /// Text of every column from 0 through the last cell or link.
    pub fn texts(&self) -> Vec<String> {
        let cell_end = self.row.cells.values().map(|c| c.last_col() as usize + 1).max();
        let link_end = self
            .row
            .links
            .values()
            .map(|l| l.range.last_col as usize + 1)
            .max();
        let width = cell_end.max(link_end).unwrap_or(0);
        (0..width).map(|col| self.cell_text(col as u16)).collect()
    }
}
