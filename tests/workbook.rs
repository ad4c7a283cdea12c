mod common;

use std::io::{Cursor, Write};
use std::sync::Arc;

use common::*;
use xlsbiff::{
    DateMode, LegacyDecoder, SheetVisibility, ValueKind, WorkbookOptions, XlsError, open_path, open_workbook,
    open_workbook_with,
};

fn sample() -> BookFixture {
    BookFixture::biff8()
        .global(FORMAT, format8(164, "yyyy-mm-dd"))
        .global(XF, xf8(164))
        .global(SST, sst(&["Name", "Value", "alpha", "beta"]))
        .sheet(
            SheetFixture::new("Data")
                .record(LABELSST, labelsst(0, 0, 0))
                .record(LABELSST, labelsst(0, 1, 1))
                .record(LABELSST, labelsst(1, 0, 2))
                .record(NUMBER, number(1, 1, 0, 1.5))
                .record(LABELSST, labelsst(2, 0, 3))
                .record(RK, rk(2, 1, 0, 42))
                .record(NUMBER, number(3, 0, 1, 43174.5))
                .record(NUMBER, number(3, 1, 2, 43174.0)),
        )
        .sheet(
            SheetFixture::new("Second")
                .record(LABEL, label(0, 0, b"first", true))
                .record(NUMBER, number(3, 2, 0, -7.25)),
        )
}

#[test]
fn test_read_all_in_declaration_order() {
    let mut wb = open_workbook(Cursor::new(sample().compound())).unwrap();
    assert_eq!(wb.sheet_count(), 2);

    let (sheets, names) = wb.read_all(10).unwrap();
    assert_eq!(names, ["Data", "Second"]);
    assert_eq!(
        sheets[0],
        vec![
            vec!["Name", "Value"],
            vec!["alpha", "1.5"],
            vec!["beta", "42"],
            vec!["2018-03-15T12:00:00Z", "2018-03-15"],
        ]
    );
    let empty: Vec<String> = Vec::new();
    assert_eq!(
        sheets[1],
        vec![
            vec!["first".to_string()],
            empty.clone(),
            empty,
            vec![String::new(), String::new(), "-7.25".to_string()],
        ]
    );
}

#[test]
fn test_read_all_budget_spans_sheets() {
    let mut wb = open_workbook(Cursor::new(sample().compound())).unwrap();
    let (sheets, _) = wb.read_all(5).unwrap();
    assert_eq!(sheets[0].len(), 4);
    assert_eq!(sheets[1].len(), 1);

    let (sheets, _) = wb.read_all(2).unwrap();
    assert_eq!(sheets[0].len(), 2);
    assert!(sheets[1].is_empty());
}

#[test]
fn test_cell_values() {
    let mut wb = open_workbook(Cursor::new(sample().compound())).unwrap();
    let sheet = wb.sheet(0).unwrap();

    let row = sheet.row(2).unwrap();
    let v = row.cell_value(1);
    assert_eq!((v.kind, v.integer), (ValueKind::Int, 42));

    let row = sheet.row(3).unwrap();
    let v = row.cell_value(1);
    assert_eq!(v.kind, ValueKind::DateTime);
    assert_eq!(v.format.as_deref(), Some("yyyy-mm-dd"));
    assert_eq!(v.float, 43174.0);

    assert!(row.cell_value(9).is_empty());
    assert_eq!(row.cell_text(9), "");
    assert!(sheet.row(40).is_none());
}

#[test]
fn test_sheet_lookup_and_metadata() {
    let book = BookFixture::biff8()
        .global(DATEMODE, words(&[1]))
        .sheet(SheetFixture::new("Shown").record(WINDOW2, window2(0x0600)))
        .sheet(SheetFixture::new("Secret").hidden().record(WINDOW2, window2(0x0240)));
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();

    assert_eq!(wb.date_mode(), DateMode::Epoch1904);
    assert_eq!(wb.to_date_time(0.0).to_iso8601(), "1904-01-01T00:00:00Z");
    assert_eq!(wb.styles().len(), 2);

    let shown = wb.sheet_by_name("Shown").unwrap().unwrap();
    assert!(shown.is_selected());
    assert!(!shown.is_right_to_left());
    assert_eq!(shown.max_row(), None);

    let secret = wb.sheet_by_name("Secret").unwrap().unwrap();
    assert_eq!(secret.visibility(), SheetVisibility::Hidden);
    assert!(secret.is_right_to_left());
    assert!(!secret.is_selected());

    assert!(wb.sheet_by_name("Missing").is_none());
    assert!(matches!(
        wb.sheet(2),
        Err(XlsError::SheetIndexOutOfRange { index: 2, count: 2 })
    ));
}

#[test]
fn test_shared_string_split_across_continue() {
    // "world wide" starts compressed in the SST and ends as UTF-16 in CONTINUE
    let mut sst_payload = 2u32.to_le_bytes().to_vec();
    sst_payload.extend_from_slice(&2u32.to_le_bytes());
    sst_payload.extend(string8("hello"));
    sst_payload.extend(words(&[10]));
    sst_payload.push(0);
    sst_payload.extend_from_slice(b"world");
    let mut continued = vec![0x01];
    continued.extend(" wide".encode_utf16().flat_map(u16::to_le_bytes));

    let book = BookFixture::biff8()
        .global(SST, sst_payload)
        .global(CONTINUE, continued)
        .sheet(
            SheetFixture::new("S")
                .record(LABELSST, labelsst(0, 0, 0))
                .record(LABELSST, labelsst(0, 1, 1)),
        );
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert_eq!(wb.shared_strings().len(), 2);
    assert_eq!(wb.shared_strings().get(1), Some("world wide"));

    let sheet = wb.sheet(0).unwrap();
    assert_eq!(sheet.row(0).unwrap().texts(), ["hello", "world wide"]);
}

#[test]
fn test_shared_string_spanning_several_continues() {
    // "abcdefghij": compressed in the SST, UTF-16 in the first CONTINUE,
    // compressed again in the second, which also carries the next string
    let mut sst_payload = 2u32.to_le_bytes().to_vec();
    sst_payload.extend_from_slice(&2u32.to_le_bytes());
    sst_payload.extend(words(&[10]));
    sst_payload.push(0);
    sst_payload.extend_from_slice(b"abc");
    let mut first = vec![0x01];
    first.extend("def".encode_utf16().flat_map(u16::to_le_bytes));
    let mut second = vec![0x00];
    second.extend_from_slice(b"ghij");
    second.extend(string8("tail"));

    let book = BookFixture::biff8()
        .global(SST, sst_payload)
        .global(CONTINUE, first)
        .global(CONTINUE, second)
        .sheet(
            SheetFixture::new("S")
                .record(LABELSST, labelsst(0, 0, 0))
                .record(LABELSST, labelsst(0, 1, 1)),
        );
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert_eq!(wb.shared_strings().get(0), Some("abcdefghij"));
    assert_eq!(wb.shared_strings().get(1), Some("tail"));
    assert_eq!(wb.sheet(0).unwrap().row(0).unwrap().texts(), ["abcdefghij", "tail"]);
}

#[test]
fn test_shared_string_formatting_runs_cross_continues() {
    // rich + phonetic string: 2 runs (8 bytes) and a 6-byte phonetic block,
    // split so both blocks straddle record boundaries
    let mut sst_payload = 2u32.to_le_bytes().to_vec();
    sst_payload.extend_from_slice(&2u32.to_le_bytes());
    sst_payload.extend(words(&[4]));
    sst_payload.push(0x0C);
    sst_payload.extend(words(&[2]));
    sst_payload.extend_from_slice(&6u32.to_le_bytes());
    sst_payload.extend_from_slice(b"rich");
    sst_payload.extend_from_slice(&[0xA1, 0xA2, 0xA3]);
    let first = vec![0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xB1, 0xB2];
    let mut second = vec![0xB3, 0xB4, 0xB5, 0xB6];
    second.extend(string8("next"));

    let book = BookFixture::biff8()
        .global(SST, sst_payload)
        .global(CONTINUE, first)
        .global(CONTINUE, second)
        .sheet(SheetFixture::new("S").record(LABELSST, labelsst(0, 0, 1)));
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert_eq!(wb.shared_strings().len(), 2);
    assert_eq!(wb.shared_strings().get(0), Some("rich"));
    assert_eq!(wb.shared_strings().get(1), Some("next"));
    assert_eq!(wb.sheet(0).unwrap().row(0).unwrap().cell_text(0), "next");
}

#[test]
fn test_unattributed_continue_is_ignored() {
    let book = BookFixture::biff8()
        .global(SST, sst(&["only"]))
        .global(CODEPAGE, words(&[1200]))
        .global(CONTINUE, vec![0x00, b'x', b'y'])
        .sheet(SheetFixture::new("S").record(LABELSST, labelsst(0, 0, 0)));
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert_eq!(wb.shared_strings().len(), 1);
    assert_eq!(wb.sheet(0).unwrap().row(0).unwrap().cell_text(0), "only");
}

#[test]
fn test_shared_string_index_out_of_range_is_empty() {
    let book = BookFixture::biff8()
        .global(SST, sst(&["a"]))
        .sheet(SheetFixture::new("S").record(LABELSST, labelsst(0, 0, 5)));
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    let sheet = wb.sheet(0).unwrap();
    assert_eq!(sheet.row(0).unwrap().cell_text(0), "");
}

#[test]
fn test_formula_results() {
    let string_marker = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
    let bool_true = [1, 0, 1, 0, 0, 0, 0xFF, 0xFF];
    let div0 = [2, 0, 0x07, 0, 0, 0, 0xFF, 0xFF];
    let book = BookFixture::biff8().sheet(
        SheetFixture::new("F")
            .record(FORMULA, formula(0, 0, string_marker))
            .record(STRING, string8("computed"))
            .record(FORMULA, formula(0, 1, 3.5f64.to_le_bytes()))
            .record(FORMULA, formula(0, 2, bool_true))
            .record(FORMULA, formula(0, 3, div0))
            .record(FORMULA, formula(1, 0, string_marker)),
    );
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    let sheet = wb.sheet(0).unwrap();
    let row = sheet.row(0).unwrap();
    assert_eq!(row.texts(), ["computed", "3.5", "TRUE", "#DIV/0!"]);
    assert_eq!(row.cell_value(3).kind, ValueKind::Error);
    assert_eq!(row.cell_value(2).kind, ValueKind::Bool);
    // string result whose STRING record never arrived
    assert_eq!(sheet.row(1).unwrap().cell_text(0), "");
}

#[test]
fn test_string_without_formula_fails_sheet() {
    let book = BookFixture::biff8()
        .sheet(
            SheetFixture::new("Bad")
                .record(NUMBER, number(0, 0, 0, 1.0))
                .record(STRING, string8("orphan")),
        )
        .sheet(SheetFixture::new("Good").record(NUMBER, number(0, 0, 0, 2.0)));
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert!(matches!(wb.sheet(0), Err(XlsError::UnexpectedRecordSequence(_))));
    assert_eq!(wb.sheet(1).unwrap().row(0).unwrap().cell_text(0), "2");
}

#[test]
fn test_formula_string_must_directly_follow() {
    let string_marker = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
    let book = BookFixture::biff8()
        .sheet(
            SheetFixture::new("Window")
                .record(FORMULA, formula(0, 0, string_marker))
                .record(WINDOW2, window2(0x0400))
                .record(STRING, string8("late")),
        )
        .sheet(
            SheetFixture::new("Unknown")
                .record(FORMULA, formula(0, 0, string_marker))
                .record(0x1234, vec![0; 4])
                .record(STRING, string8("late")),
        );
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert!(matches!(wb.sheet(0), Err(XlsError::UnexpectedRecordSequence(_))));
    assert!(matches!(wb.sheet(1), Err(XlsError::UnexpectedRecordSequence(_))));
}

#[test]
fn test_column_collision_is_fatal() {
    let book = BookFixture::biff8().sheet(
        SheetFixture::new("Dup")
            .record(NUMBER, number(0, 1, 0, 1.0))
            .record(RK, rk(0, 1, 0, 2)),
    );
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert!(matches!(wb.sheet(0), Err(XlsError::UnexpectedRecordSequence(_))));
    // the sheet stays unparsed, so asking again fails again
    assert!(wb.sheet(0).is_err());
    assert!(!wb.sheets()[0].is_parsed());
}

#[test]
fn test_run_expansion() {
    let book = BookFixture::biff8().sheet(
        SheetFixture::new("Runs")
            .record(MULRK, mulrk(0, 3, &[10, 20, 30, 40]))
            .record(MULRK, mulrk(0, 7, &[50, 60])),
    );
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    let sheet = wb.sheet(0).unwrap();
    let row = sheet.row(0).unwrap();

    for (col, expected) in (3..=6).zip(["10", "20", "30", "40"]) {
        assert_eq!(row.cell_text_exact(col), expected);
        assert_eq!(row.cell_text(col), expected);
        assert!(row.cell(col).is_some());
    }
    assert_eq!(row.cell_text(2), "");
    assert_eq!(row.first_col(), Some(3));
    assert_eq!(row.last_col(), Some(8));
    assert_eq!(row.cells().count(), 6);
    assert_eq!(row.texts().len(), 9);
}

#[test]
fn test_hyperlinks() {
    let book = BookFixture::biff8().sheet(
        SheetFixture::new("Links")
            .record(NUMBER, number(0, 0, 0, 1.0))
            .record(HYPERLINK, url_link((0, 1), 1, "Docs", "https://example.com/")),
    );
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    let sheet = wb.sheet(0).unwrap();

    let row = sheet.row(0).unwrap();
    assert_eq!(row.texts(), ["1", "Docs(https://example.com/)"]);
    assert_eq!(row.cell_text_exact(1), "");
    let link = row.hyperlink(1).unwrap();
    assert_eq!(link.url.as_deref(), Some("https://example.com/"));
    assert!(row.hyperlink(0).is_none());

    assert_eq!(sheet.row(1).unwrap().cell_text(1), "Docs(https://example.com/)");
    assert_eq!(sheet.max_row(), Some(1));
    assert_eq!(sheet.hyperlinks().len(), 1);
}

#[test]
fn test_legacy_workbook_with_codepage() {
    // "Лист" and "При" in Windows-1251
    let book = BookFixture::biff5(1251).sheet(
        SheetFixture::with_raw_name(b"\xcb\xe8\xf1\xf2")
            .record(LABEL, label(0, 0, b"\xcf\xf0\xe8", false))
            .record(RK, rk(0, 1, 0, 5)),
    );
    let mut wb = open_workbook_with(Cursor::new(book.compound()), WorkbookOptions::default()).unwrap();
    assert!(wb.globals().is_legacy());
    assert_eq!(wb.globals().codepage(), Some(1251));
    assert_eq!(wb.sheet_names(), ["Лист"]);
    let sheet = wb.sheet(0).unwrap();
    assert_eq!(sheet.row(0).unwrap().texts(), ["При", "5"]);
}

struct Shouting;

impl LegacyDecoder for Shouting {
    fn decode_legacy(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_uppercase()
    }
}

#[test]
fn test_injected_legacy_decoder() {
    let book = BookFixture::biff5(1252)
        .sheet(SheetFixture::new("quiet").record(LABEL, label(0, 0, b"hello", false)));
    let options = WorkbookOptions::default().with_legacy_decoder(Arc::new(Shouting));
    let mut wb = open_workbook_with(Cursor::new(book.compound()), options).unwrap();
    assert_eq!(wb.sheet_names(), ["QUIET"]);
    assert_eq!(wb.sheet(0).unwrap().row(0).unwrap().cell_text(0), "HELLO");
}

#[test]
fn test_shared_string_limit() {
    let book = BookFixture::biff8().global(SST, sst(&["a", "b", "c"]));
    let options = WorkbookOptions::default().with_max_shared_strings(2);
    let err = open_workbook_with(Cursor::new(book.compound()), options).unwrap_err();
    assert!(matches!(err, XlsError::MalformedRecord { record_id: SST, .. }));
}

#[test]
fn test_duplicate_format_id() {
    let book = BookFixture::biff8()
        .global(FORMAT, format8(164, "0.0"))
        .global(FORMAT, format8(164, "0.00"));
    let err = open_workbook(Cursor::new(book.compound())).unwrap_err();
    assert!(matches!(err, XlsError::DuplicateFormatId(164)));
}

#[test]
fn test_short_xf_record_is_salvaged() {
    let book = BookFixture::biff8()
        .global(XF, words(&[0, 14]))
        .sheet(SheetFixture::new("S").record(NUMBER, number(0, 0, 2, 0.5)));
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert_eq!(wb.styles().len(), 3);
    assert_eq!(wb.styles()[2].format_id, 14);
    let sheet = wb.sheet(0).unwrap();
    assert_eq!(sheet.row(0).unwrap().cell_value(0).kind, ValueKind::DateTime);
}

#[test]
fn test_negative_zero_keeps_sign() {
    let book = BookFixture::biff8().sheet(SheetFixture::new("S").record(NUMBER, number(0, 0, 0, -0.0)));
    let mut wb = open_workbook(Cursor::new(book.compound())).unwrap();
    assert_eq!(wb.sheet(0).unwrap().row(0).unwrap().cell_text(0), "-0");
}

#[test]
fn test_container_errors() {
    let err = open_workbook(Cursor::new(b"definitely not a compound file".to_vec())).unwrap_err();
    assert!(matches!(err, XlsError::NotAContainerFormat));

    let other = compound_with(&[("WordDocument", vec![0u8; 8])]);
    let err = open_workbook(Cursor::new(other)).unwrap_err();
    assert!(matches!(err, XlsError::WorkbookStreamNotFound));
}

#[test]
fn test_open_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&sample().compound()).unwrap();
    file.flush().unwrap();

    let mut wb = open_path(file.path()).unwrap();
    assert_eq!(wb.sheet_names(), ["Data", "Second"]);
    assert_eq!(wb.sheet(1).unwrap().row(0).unwrap().cell_text(0), "first");
}

#[test]
fn test_truncated_stream_ends_cleanly() {
    let mut stream = sample().stream();
    // last sheet loses its EOF and ends in half a record header
    stream.truncate(stream.len() - 4);
    stream.extend_from_slice(&[0x03, 0x02]);
    let mut wb = open_workbook(Cursor::new(compound_with(&[("Workbook", stream)]))).unwrap();
    assert_eq!(wb.read_all(100).unwrap().0.len(), 2);
}
