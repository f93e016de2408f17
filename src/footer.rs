use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use image::ImageFormat;
use regex::Regex;

use crate::brand::BrandProfile;
use crate::changelog::{FixKind, FixLog};
use crate::docx::{REL_NS, WML_NS};
use crate::error::Error;
use crate::model::{
    Alignment, Document, Namespaces, Paragraph, PartRef, RawXml, REL_FOOTER, REL_IMAGE, Run,
    Section, rels_path_for,
};
use crate::writer::{esc, namespace_attrs, paragraph_xml, render_document, render_rels};

const EMU_PER_INCH: f32 = 914_400.0;
const CT_FOOTER: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";

const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

static RE_DOC_PR_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"docPr\b[^>]*?\bid="(\d+)""#).expect("valid docPr regex"));

/// Logo location: absolute as configured, otherwise under the asset root.
pub fn logo_path(brand: &BrandProfile, asset_root: &Path) -> PathBuf {
    if brand.logo.path.is_absolute() {
        brand.logo.path.clone()
    } else {
        asset_root.join(&brand.logo.path)
    }
}

/// Drawing ids are unique across the whole package. Returns one above the
/// highest id in the body and every XML part.
fn next_drawing_id(doc: &Document) -> u32 {
    let mut max = 0;
    let mut scan = |xml: &str| {
        for caps in RE_DOC_PR_ID.captures_iter(xml) {
            if let Ok(id) = caps[1].parse::<u32>() {
                max = max.max(id);
            }
        }
    };
    scan(render_document(doc).as_str());
    for (name, bytes) in &doc.package.parts {
        if name.ends_with(".xml") {
            scan(String::from_utf8_lossy(bytes).as_ref());
        }
    }
    max + 1
}

fn inline_picture(rel_id: &str, id: u32, name: &str, cx: u64, cy: u64) -> String {
    format!(
        "<w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/><wp:docPr id=\"{id}\" name=\"{name}\"/>\
         <wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect=\"1\"/></wp:cNvGraphicFramePr>\
         <a:graphic><a:graphicData uri=\"{PIC_NS}\"><pic:pic>\
         <pic:nvPicPr><pic:cNvPr id=\"0\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>\
         <pic:blipFill><a:blip r:embed=\"{rel_id}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
         </pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"
    )
}

fn footer_xml(drawing: String) -> String {
    let mut paragraph = Paragraph::default();
    paragraph.props.alignment = Some(Alignment::Center);
    paragraph.runs.push(Run {
        objects: vec![RawXml {
            name: "drawing".into(),
            xml: drawing,
        }],
        ..Default::default()
    });

    let namespaces = namespace_attrs(
        &Namespaces::default(),
        &[
            ("w", WML_NS),
            ("r", REL_NS),
            ("wp", WP_NS),
            ("a", A_NS),
            ("pic", PIC_NS),
        ],
    );
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:ftr{namespaces}>"
    );
    paragraph_xml(&paragraph, None, &mut xml);
    xml.push_str("</w:ftr>");
    xml
}

/// Replaces the first section's default footer with one holding the centered
/// brand logo. A missing logo file is recorded and skipped. Returns whether
/// the logo was added.
pub fn add_logo(
    doc: &mut Document,
    brand: &BrandProfile,
    asset_root: &Path,
    log: &mut FixLog,
) -> Result<bool, Error> {
    let path = logo_path(brand, asset_root);
    if !path.is_file() {
        log::warn!("logo not found at {}", path.display());
        log.record(FixKind::Logo, "Logo file not found, skipped", "Footer");
        return Ok(false);
    }

    let format = ImageFormat::from_path(&path)?;
    let (width, height) = image::image_dimensions(&path)?;
    if width == 0 || height == 0 {
        return Err(Error::Image(format!("{} has no pixels", path.display())));
    }
    let ext = format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("png");
    let bytes = std::fs::read(&path)?;

    let cx = (brand.logo.width_inches * EMU_PER_INCH).round() as u64;
    let cy = (cx as f64 * height as f64 / width as f64).round() as u64;

    let drawing_id = next_drawing_id(doc);
    let package = &mut doc.package;
    let main_dir = package.main_dir().to_string();
    let media_part = package.unused_part_name(&format!("{main_dir}media/"), "brand-logo", ext);
    let footer_part = package.unused_part_name(&main_dir, "footer", "xml");
    let media_target = media_part.strip_prefix(&main_dir).unwrap_or(&media_part);
    let footer_target = footer_part.strip_prefix(&main_dir).unwrap_or(&footer_part);

    let image_rel = crate::model::Relationship {
        id: "rId1".to_string(),
        rel_type: REL_IMAGE.to_string(),
        target: media_target.to_string(),
        external: false,
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "logo".to_string());
    let footer = footer_xml(inline_picture(&image_rel.id, drawing_id, &esc(&name), cx, cy));

    package.parts.insert(media_part.clone(), bytes);
    package.parts.insert(rels_path_for(&footer_part), render_rels(&[image_rel]).into_bytes());
    package.parts.insert(footer_part.clone(), footer.into_bytes());
    package.ensure_default(ext, format.to_mime_type());
    package.set_override(&footer_part, CT_FOOTER);
    let rel_id = package.add_rel(REL_FOOTER, footer_target, false);

    if doc.sections.is_empty() {
        doc.sections.push(Section::default());
    }
    let footers = &mut doc.sections[0].props.footers;
    let replaced: Vec<PartRef> = footers.iter().filter(|f| f.kind == "default").cloned().collect();
    footers.retain(|f| f.kind != "default");
    footers.insert(
        0,
        PartRef {
            kind: "default".to_string(),
            rel_id,
        },
    );
    drop_unreferenced_footers(doc, &replaced);

    log::info!("added logo {} to footer ({cx}x{cy} EMU)", path.display());
    log.record_after(
        FixKind::Logo,
        format!("Added {} logo to footer", brand.name),
        "Footer",
        "Logo inserted with proper branding",
    );
    Ok(true)
}

/// Removes footer parts no section refers to any more.
fn drop_unreferenced_footers(doc: &mut Document, replaced: &[PartRef]) {
    for old in replaced {
        let still_used = doc
            .sections
            .iter()
            .flat_map(|s| s.props.footers.iter())
            .any(|f| f.rel_id == old.rel_id);
        if still_used {
            continue;
        }
        let Some(rel) = doc.package.rel(&old.rel_id).cloned() else {
            continue;
        };
        let path = doc.package.target_path(&rel);
        log::debug!("dropping replaced footer {path}");
        doc.package.remove_part(&path);
        doc.package.rels.retain(|r| r.id != rel.id);
    }
}
