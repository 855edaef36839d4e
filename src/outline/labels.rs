//! Page label ranges.

use lopdf::{Document, Object, dictionary};

use crate::error::{BundleError, Result};

/// Number the frontmatter in lowercase Roman numerals and restart Arabic
/// numbering at 1 on the first content page.
///
/// # Errors
///
/// Returns [`BundleError::PageLabels`] if the document has no catalog.
pub fn write_page_labels(doc: &mut Document, frontmatter_len: usize) -> Result<()> {
    let arabic = dictionary! { "S" => "D", "St" => 1 };
    let nums = if frontmatter_len == 0 {
        vec![Object::Integer(0), Object::Dictionary(arabic)]
    } else {
        vec![
            Object::Integer(0),
            Object::Dictionary(dictionary! { "S" => "r" }),
            Object::Integer(frontmatter_len as i64),
            Object::Dictionary(arabic),
        ]
    };

    let catalog = doc
        .catalog_mut()
        .map_err(|e| BundleError::page_labels(e.to_string()))?;
    catalog.set("PageLabels", dictionary! { "Nums" => nums });
    log::debug!("Roman page labels on the first {frontmatter_len} page(s)");
    Ok(())
}
