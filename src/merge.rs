use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{ReimburseError, Result};

const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];
const MAX_TREE_DEPTH: usize = 64;

fn pdf_err(path: &Path, e: impl std::fmt::Display) -> ReimburseError {
    ReimburseError::Pdf(format!("{}: {e}", path.display()))
}

/// The page dictionary with every attribute it inherits through its `Parent`
/// chain copied onto it, so it no longer depends on its page tree.
fn flatten_page(doc: &Document, page_id: ObjectId) -> lopdf::Result<Dictionary> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(node_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            break;
        }
        let node = doc.get_dictionary(node_id)?;
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    page.remove(b"Parent");
    Ok(page)
}

/// Concatenate the pages of `inputs`, in order, into a single PDF at `output`.
///
/// Every input is renumbered into one object space. Pages carry their
/// inherited attributes and hang off one fresh page tree. The source page
/// trees and outlines are dropped. An empty input list produces a valid
/// zero-page document.
pub fn merge_pdfs(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let mut merged = Document::with_version("1.5");
    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut catalog: Option<(ObjectId, Dictionary)> = None;

    for path in inputs {
        let mut doc = Document::load(path).map_err(|e| pdf_err(path, e))?;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            let page = flatten_page(&doc, page_id).map_err(|e| pdf_err(path, e))?;
            pages.push((page_id, page));
        }

        for (id, object) in doc.objects {
            let kind = object.type_name().unwrap_or("").to_string();
            match kind.as_str() {
                "Catalog" => {
                    if catalog.is_none() {
                        if let Ok(dict) = object.as_dict() {
                            catalog = Some((id, dict.clone()));
                        }
                    }
                }
                "Pages" | "Page" | "Outlines" | "Outline" => {}
                _ => {
                    merged.objects.insert(id, object);
                }
            }
        }
    }

    let tree_id = (next_id, 0);
    next_id += 1;
    let (catalog_id, mut catalog) = catalog.unwrap_or_else(|| ((next_id, 0), Dictionary::new()));

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = pages.len();
    for (page_id, mut page) in pages {
        page.set("Parent", tree_id);
        merged.objects.insert(page_id, Object::Dictionary(page));
    }

    let mut tree = Dictionary::new();
    tree.set("Type", Object::Name(b"Pages".to_vec()));
    tree.set("Kids", kids);
    tree.set("Count", count as i64);
    merged.objects.insert(tree_id, Object::Dictionary(tree));

    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", tree_id);
    catalog.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.trailer.set("Root", catalog_id);

    merged.max_id = merged.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    merged.renumber_objects();
    merged.compress();
    merged.save(output).map_err(|e| pdf_err(output, e))?;

    tracing::info!(
        inputs = inputs.len(),
        pages = count,
        output = %output.display(),
        "merged invoices"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::BufWriter;

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};
    use printpdf::{BuiltinFont, Mm, PdfDocument};

    use super::*;

    fn write_invoice(path: &Path, label: &str, page_count: usize) {
        let (doc, page, layer) = PdfDocument::new(label, Mm(210.0), Mm(297.0), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).unwrap();
        doc.get_page(page)
            .get_layer(layer)
            .use_text(label, 12.0, Mm(20.0), Mm(270.0), &font);
        for _ in 1..page_count {
            doc.add_page(Mm(210.0), Mm(297.0), "Layer");
        }
        let mut out = BufWriter::new(File::create(path).unwrap());
        doc.save(&mut out).unwrap();
    }

    #[test]
    fn test_merge_concatenates_pages() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("T1.pdf");
        let b = dir.path().join("T2.pdf");
        write_invoice(&a, "T1", 2);
        write_invoice(&b, "T2", 1);

        let out = dir.path().join("merged.pdf");
        merge_pdfs(&[a, b], &out).unwrap();

        let merged = Document::load(&out).unwrap();
        assert_eq!(merged.get_pages().len(), 3);
    }

    /// One-page PDF whose `MediaBox` and `Resources` live only on the page
    /// tree root, as many invoicing tools write them.
    fn write_tree_invoice(path: &Path, label: &str, width: i64) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(20), Object::Integer(20)]),
                Operation::new("Tj", vec![Object::string_literal(label)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(500),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn page_text(doc: &Document, page_id: ObjectId) -> String {
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
    }

    #[test]
    fn test_merge_keeps_inherited_page_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let narrow = dir.path().join("T1.pdf");
        let wide = dir.path().join("T2.pdf");
        write_tree_invoice(&narrow, "T1", 300);
        write_tree_invoice(&wide, "T2", 900);

        let out = dir.path().join("merged.pdf");
        merge_pdfs(&[narrow, wide], &out).unwrap();

        let merged = Document::load(&out).unwrap();
        let pages: Vec<ObjectId> = merged.get_pages().into_values().collect();
        assert_eq!(pages.len(), 2);
        for (page_id, width) in pages.iter().zip([300, 900]) {
            let page = merged.get_dictionary(*page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            assert_eq!(media_box.len(), 4);
            assert_eq!(media_box[2].as_i64().unwrap(), width);
            assert!(page.has(b"Resources"));
        }

        let catalog_id = merged.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = merged.get_dictionary(catalog_id).unwrap();
        let root_id = catalog.get(b"Pages").unwrap().as_reference().unwrap();
        let root = merged.get_dictionary(root_id).unwrap();
        assert!(!root.has(b"MediaBox"));
        assert_eq!(root.get(b"Count").unwrap().as_i64().unwrap(), 2);
    }

    #[test]
    fn test_merge_keeps_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = ["T3", "T1", "T2"]
            .iter()
            .map(|label| {
                let path = dir.path().join(format!("{label}.pdf"));
                write_tree_invoice(&path, label, 600);
                path
            })
            .collect();

        let out = dir.path().join("merged.pdf");
        merge_pdfs(&paths, &out).unwrap();

        let merged = Document::load(&out).unwrap();
        let labels: Vec<String> = merged
            .get_pages()
            .into_values()
            .map(|id| page_text(&merged, id))
            .collect();
        assert_eq!(labels.len(), 3);
        assert!(labels[0].contains("(T3)"));
        assert!(labels[1].contains("(T1)"));
        assert!(labels[2].contains("(T2)"));
    }

    #[test]
    fn test_merge_same_file_twice() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("T1.pdf");
        write_invoice(&a, "T1", 1);

        let out = dir.path().join("merged.pdf");
        merge_pdfs(&[a.clone(), a], &out).unwrap();
        assert_eq!(Document::load(&out).unwrap().get_pages().len(), 2);
    }

    #[test]
    fn test_merge_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("merged.pdf");
        merge_pdfs(&[], &out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_merge_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("T9.pdf");
        std::fs::write(&bogus, b"not a pdf").unwrap();
        let out = dir.path().join("merged.pdf");
        let err = merge_pdfs(&[bogus], &out).unwrap_err();
        assert!(matches!(err, ReimburseError::Pdf(_)));
        assert!(!out.exists());
    }
}
