//! End-to-end tests against a PDF built in memory with lopdf.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use linkpdf::{extract_bytes, extract_bytes_with_options, ExtractOptions};

/// Build a two-page PDF: page 1 has two text runs on one line covered by a
/// link annotation, page 2 has plain text on two lines. The trailer carries
/// an info dictionary.
fn build_test_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    // Page 1: "Hello" at (10, 100) and "World" at (50, 100).
    let content1 = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![10.into(), 100.into()]),
            Operation::new("Tj", vec![Object::string_literal("Hello")]),
            Operation::new("Td", vec![40.into(), 0.into()]),
            Operation::new("Tj", vec![Object::string_literal("World")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content1_id = doc.add_object(Stream::new(dictionary! {}, content1.encode().unwrap()));

    let annot_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![0.into(), 90.into(), 200.into(), 110.into()],
        "A" => dictionary! {
            "Type" => "Action",
            "S" => "URI",
            "URI" => Object::string_literal("http://example.com"),
        },
    });

    let page1_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content1_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => vec![annot_id.into()],
    });

    // Page 2: two lines, no annotations.
    let content2 = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![10.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("Page two")]),
            Operation::new("Td", vec![0.into(), (-20).into()]),
            Operation::new("Tj", vec![Object::string_literal("second line")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content2_id = doc.add_object(Stream::new(dictionary! {}, content2.encode().unwrap()));

    let page2_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content2_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page1_id.into(), page2_id.into()],
            "Count" => 2,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Roundtrip Fixture"),
        "Producer" => Object::string_literal("linkpdf tests"),
        "CreationDate" => Object::string_literal("D:20240301120000"),
    });

    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[test]
fn test_extracts_both_pages_in_order() {
    let result = extract_bytes(&build_test_pdf()).unwrap();

    assert_eq!(result.page_count(), 2);
    assert_eq!(result.pages[0].page_info.num, 1);
    assert_eq!(result.pages[1].page_info.num, 2);
}

#[test]
fn test_unfiltered_content_streams_extract() {
    // The fixture's content streams carry no Filter entry; they must be
    // read as stored.
    let data = build_test_pdf();

    let doc = Document::load_mem(&data).unwrap();
    for (_, page_id) in doc.get_pages() {
        let page = doc.get_dictionary(page_id).unwrap();
        let Object::Reference(r) = page.get(b"Contents").unwrap() else {
            panic!("fixture Contents should be a reference");
        };
        let Object::Stream(stream) = doc.get_object(*r).unwrap() else {
            panic!("fixture Contents should resolve to a stream");
        };
        assert!(stream.dict.get(b"Filter").is_err());
    }

    let result = extract_bytes(&data).unwrap();
    assert!(result.page(1).unwrap().content.contains("Hello"));
    assert!(result.page(2).unwrap().content.contains("Page two"));
}

#[test]
fn test_flate_compressed_content_streams_extract() {
    let mut doc = Document::load_mem(&build_test_pdf()).unwrap();
    doc.compress();
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();

    let result = extract_bytes(&buf).unwrap();
    assert_eq!(
        result.page(1).unwrap().content,
        "<a href=\"http://example.com\">Hello World</a>\n"
    );
}

#[test]
fn test_linked_runs_fuse_into_one_anchor() {
    let result = extract_bytes(&build_test_pdf()).unwrap();

    assert_eq!(
        result.page(1).unwrap().content,
        "<a href=\"http://example.com\">Hello World</a>\n"
    );
}

#[test]
fn test_unlinked_page_has_no_markup_and_a_line_break() {
    let result = extract_bytes(&build_test_pdf()).unwrap();

    let content = &result.page(2).unwrap().content;
    assert!(!content.contains("<a"));
    assert_eq!(content, "Page two \n second line\n");
}

#[test]
fn test_viewport_reflects_media_box() {
    let result = extract_bytes(&build_test_pdf()).unwrap();

    let info = &result.page(1).unwrap().page_info;
    assert_eq!(info.width, 612.0);
    assert_eq!(info.height, 792.0);
    assert_eq!(info.scale, 1.0);
    assert_eq!(info.rotation, 0);
}

#[test]
fn test_info_dictionary_is_collected() {
    let result = extract_bytes(&build_test_pdf()).unwrap();

    assert_eq!(
        result.meta.info.get("Title").map(String::as_str),
        Some("Roundtrip Fixture")
    );
    assert!(result.meta.creation_date().is_some());
}

#[test]
fn test_page_range_selects_a_single_page() {
    let options = ExtractOptions::new().with_first_page(2);
    let result = extract_bytes_with_options(&build_test_pdf(), &options).unwrap();

    assert_eq!(result.page_count(), 1);
    assert_eq!(result.pages[0].page_info.num, 2);
}

#[test]
fn test_inverted_range_yields_no_pages() {
    let options = ExtractOptions::new().with_first_page(2).with_last_page(1);
    let result = extract_bytes_with_options(&build_test_pdf(), &options).unwrap();

    assert!(result.pages.is_empty());
}

#[test]
fn test_json_serialization_shape() {
    let result = extract_bytes(&build_test_pdf()).unwrap();
    let json = result.to_json().unwrap();

    assert!(json.contains("\"pageInfo\""));
    assert!(json.contains("\"num\":1"));
    assert!(json.contains("Roundtrip Fixture"));
}
