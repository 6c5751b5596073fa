use std::io::Write;

use xtree::{parse_str, Config, Document, Error, ErrorKind, NodeId};

fn value_of(doc: &Document, id: NodeId) -> (Option<&str>, Option<bool>) {
    doc.get(id)
        .map_or((None, None), |el| (el.value(), el.is_cdata()))
}

const CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- a small catalog -->
<catalog version="2" lang="en">
    <book id="bk101" available="yes">
        <title>XML Developer's Guide</title>
        <price>44.95</price>
        <notes><![CDATA[Contains <markup> & stuff]]></notes>
    </book>
    <book id="bk102">
        <title>Midnight &amp; Rain</title>
        <empty/>
    </book>
</catalog>
"#;

#[test]
fn test_catalog_structure() -> Result<(), Error> {
    let doc = parse_str(CATALOG, Config::default())?;
    let catalog = doc.root()?;
    let el = doc.get(catalog).ok_or_else(Error::parsing_failed)?;
    assert_eq!(el.name(), "catalog");
    assert_eq!(el.attribute("version"), Some("2"));

    let ids: Vec<&str> = doc
        .children(catalog)
        .filter_map(|(_, book)| book.attribute("id"))
        .collect();
    assert_eq!(ids, ["bk101", "bk102"]);
    Ok(())
}

#[test]
fn test_catalog_values_and_provenance() -> Result<(), Error> {
    let doc = parse_str(CATALOG, Config::default())?;
    let catalog = doc.root()?;
    let first = doc.first_child_named(catalog, "book")?;

    let title = doc.first_child_named(first, "title")?;
    assert_eq!(
        value_of(&doc, title),
        (Some("XML Developer's Guide"), Some(false))
    );

    let notes = doc.first_child_named(first, "notes")?;
    assert_eq!(
        value_of(&doc, notes),
        (Some("Contains <markup> & stuff"), Some(true))
    );

    let second = doc
        .children(catalog)
        .nth(1)
        .map(|(id, _)| id)
        .ok_or_else(Error::parsing_failed)?;
    let title = doc.first_child_named(second, "title")?;
    assert_eq!(value_of(&doc, title), (Some("Midnight & Rain"), Some(false)));
    let empty = doc.first_child_named(second, "empty")?;
    assert_eq!(value_of(&doc, empty), (None, None));
    Ok(())
}

#[test]
fn test_text_before_child_is_kept_untrimmed() -> Result<(), Error> {
    // the parent is no longer the open element once its child has closed
    let doc = parse_str("<a> head <b/> tail </a>", Config::default())?;
    assert_eq!(value_of(&doc, doc.root()?), (Some(" head "), Some(false)));

    let doc = parse_str("<a>\n  <b/>\n</a>", Config::default())?;
    assert_eq!(value_of(&doc, doc.root()?), (Some("\n  "), Some(false)));
    Ok(())
}

#[test]
fn test_leaf_whitespace_trimmed_to_empty() -> Result<(), Error> {
    let doc = parse_str("<a>\n   \n</a>", Config::default())?;
    assert_eq!(value_of(&doc, doc.root()?), (Some(""), Some(false)));

    let doc = parse_str("<a>\n   \n</a>", Config::default().with_trim_whitespace(false))?;
    assert_eq!(value_of(&doc, doc.root()?), (Some("\n   \n"), Some(false)));
    Ok(())
}

#[test]
fn test_empty_cdata_section() -> Result<(), Error> {
    let doc = parse_str("<a><![CDATA[]]></a>", Config::default())?;
    assert_eq!(value_of(&doc, doc.root()?), (None, None));
    Ok(())
}

#[test]
fn test_invalid_utf8_inside_cdata_is_ignored() -> Result<(), Error> {
    let doc = xtree::parse(b"<a>ok<![CDATA[\xff\xfe]]></a>", Config::default())?;
    assert_eq!(value_of(&doc, doc.root()?), (Some("ok"), Some(false)));
    Ok(())
}

#[test]
fn test_reader_error_surfaces_with_position() {
    let result = parse_str("<a>\n<b>\n</a>", Config::default());
    let err = result.err();
    assert_eq!(
        err.as_ref().map(Error::kind),
        Some(&ErrorKind::MismatchedTag {
            expected: "b".to_string(),
            found: "a".to_string()
        })
    );
    assert_eq!(err.map(|err| err.span().start.line), Some(3));
}

#[test]
fn test_no_partial_tree_on_failure() {
    let result = parse_str("<a><b>text</b>", Config::default());
    assert_eq!(
        result.map_err(|err| err.kind().clone()),
        Err(ErrorKind::UnexpectedEof)
    );
}

#[test]
fn test_namespace_processing() -> Result<(), Error> {
    let input = r#"<r:root xmlns:r="urn:r" xmlns="urn:d"><item r:k="v"/></r:root>"#;

    let doc = parse_str(input, Config::default().with_process_namespaces(true))?;
    let root = doc.root()?;
    assert_eq!(doc.get(root).map(|el| el.name()), Some("root"));
    assert_eq!(doc.get(root).map(|el| el.attributes().len()), Some(0));
    let item = doc.first_child_named(root, "item")?;
    assert_eq!(doc.get(item).and_then(|el| el.attribute("r:k")), Some("v"));

    let doc = parse_str(input, Config::default())?;
    let root = doc.root()?;
    assert_eq!(doc.get(root).map(|el| el.name()), Some("r:root"));
    assert_eq!(
        doc.get(root).and_then(|el| el.attribute("xmlns:r")),
        Some("urn:r")
    );
    Ok(())
}

#[test]
fn test_external_entity_resolution() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "from disk")?;
    let path = file.path().display().to_string();
    let input = format!(r#"<!DOCTYPE a [<!ENTITY ext SYSTEM "{path}">]><a>[&ext;]</a>"#);

    let resolved = parse_str(&input, Config::default().with_resolve_external_entities(true))?;
    assert_eq!(
        value_of(&resolved, resolved.root()?),
        (Some("[from disk]"), Some(false))
    );

    let skipped = parse_str(&input, Config::default())?;
    assert_eq!(value_of(&skipped, skipped.root()?), (Some("[]"), Some(false)));
    Ok(())
}

#[test]
fn test_document_constructors() -> Result<(), Error> {
    let from_str = Document::from_str("<a>1</a>", Config::default())?;
    let from_bytes = Document::from_bytes(b"<a>1</a>", Config::default())?;
    assert_eq!(from_str, from_bytes);
    Ok(())
}

#[test]
fn test_depth_limit_applies() {
    let deep = format!("{}{}", "<d>".repeat(10), "</d>".repeat(10));
    let limited = parse_str(&deep, Config::default().with_max_depth(5));
    assert_eq!(
        limited.map_err(|err| err.kind().clone()),
        Err(ErrorKind::MaxDepthExceeded { max: 5 })
    );
    assert!(parse_str(&deep, Config::unlimited()).is_ok());
}

#[test]
fn test_crlf_normalized_in_values_and_attributes() -> Result<(), Error> {
    let doc = parse_str("<a k='x\r\ny'>l1\r\nl2</a>", Config::default())?;
    let root = doc.root()?;
    assert_eq!(value_of(&doc, root), (Some("l1\nl2"), Some(false)));
    assert_eq!(doc.get(root).and_then(|el| el.attribute("k")), Some("x y"));
    Ok(())
}

#[test]
fn test_chained_entities_expand_on_use() -> Result<(), Error> {
    let input = "<!DOCTYPE a [<!ENTITY x \"one\"><!ENTITY y \"&x; two\">]><a>&y;</a>";
    let doc = parse_str(input, Config::default())?;
    assert_eq!(value_of(&doc, doc.root()?), (Some("one two"), Some(false)));
    Ok(())
}
