//! PowerPoint (`.pptx`) deck writer.
//!
//! The package is a zip of PresentationML parts: one blank layout on one
//! master, a minimal theme, and one slide part per slide. Every shape is a
//! plain text box, line or picture positioned in EMU.

use image::ImageFormat;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use ai_agent_core::{Error, Result};

const EMU_PER_INCH: u64 = 914_400;
const SLIDE_WIDTH: u64 = 10 * EMU_PER_INCH;
const SLIDE_HEIGHT: u64 = 7 * EMU_PER_INCH + EMU_PER_INCH / 2;
const DIVIDER_WIDTH: u64 = 38_100;

const TITLE_COLOR: &str = "1F4E79";
const BODY_COLOR: &str = "444444";
const ACCENT_COLOR: &str = "00B0F0";

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn inches(value: f64) -> u64 {
    (value * EMU_PER_INCH as f64).round() as u64
}

/// An image ready to embed.
#[derive(Debug, Clone)]
pub struct SlideImage {
    pub data: Vec<u8>,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
}

impl SlideImage {
    /// Identify and measure `data`. Formats PowerPoint cannot show yield `None`.
    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        let extension = match image::guess_format(&data).ok()? {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            _ => return None,
        };
        let decoded = image::load_from_memory(&data).ok()?;
        Some(Self {
            width: decoded.width(),
            height: decoded.height(),
            data,
            extension,
        })
    }
}

/// Where a picture sits on a content slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Right half; the bullets narrow to the left half.
    Beside,
    /// Small picture in the bottom-right corner under full-width bullets.
    Corner,
}

#[derive(Debug, Clone)]
pub struct Picture {
    pub image: SlideImage,
    pub placement: Placement,
}

#[derive(Debug, Clone)]
pub struct DeckSlide {
    pub title: String,
    pub bullets: Vec<String>,
    pub picture: Option<Picture>,
}

/// A title slide followed by content slides.
#[derive(Debug, Clone)]
pub struct Deck {
    pub title: String,
    pub subtitle: String,
    pub slides: Vec<DeckSlide>,
}

impl Deck {
    /// Slides in the file, title slide included.
    pub fn num_slides(&self) -> usize {
        self.slides.len() + 1
    }

    pub fn num_images(&self) -> usize {
        self.slides.iter().filter(|s| s.picture.is_some()).count()
    }
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::tool_execution(format!("PPTX writing failed: {}", e))
}

/// Write `deck` to `path` as a `.pptx` file.
pub fn render_pptx(deck: &Deck, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut out = write_pptx(deck, BufWriter::new(file))?;
    out.flush()?;
    Ok(())
}

/// Write the package into `writer` and hand it back.
pub fn write_pptx<W: Write + Seek>(deck: &Deck, writer: W) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let put = |zip: &mut ZipWriter<W>, name: &str, data: &[u8]| -> Result<()> {
        zip.start_file(name, SimpleFileOptions::default()).map_err(zip_error)?;
        zip.write_all(data)?;
        Ok(())
    };

    let count = deck.num_slides();
    put(&mut zip, "[Content_Types].xml", content_types(count).as_bytes())?;
    put(&mut zip, "_rels/.rels", root_rels().as_bytes())?;
    put(&mut zip, "ppt/presentation.xml", presentation(count).as_bytes())?;
    put(&mut zip, "ppt/_rels/presentation.xml.rels", presentation_rels(count).as_bytes())?;
    put(&mut zip, "ppt/slideMasters/slideMaster1.xml", slide_master().as_bytes())?;
    put(
        &mut zip,
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ])
        .as_bytes(),
    )?;
    put(&mut zip, "ppt/slideLayouts/slideLayout1.xml", slide_layout().as_bytes())?;
    put(
        &mut zip,
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]).as_bytes(),
    )?;
    put(&mut zip, "ppt/theme/theme1.xml", THEME.as_bytes())?;

    put(&mut zip, "ppt/slides/slide1.xml", title_slide(deck).as_bytes())?;
    put(
        &mut zip,
        "ppt/slides/_rels/slide1.xml.rels",
        relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]).as_bytes(),
    )?;

    let mut media = 0;
    for (i, slide) in deck.slides.iter().enumerate() {
        let number = i + 2;
        let mut rels = vec![("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml".to_string())];
        if let Some(picture) = &slide.picture {
            media += 1;
            let name = format!("image{}.{}", media, picture.image.extension);
            put(&mut zip, &format!("ppt/media/{}", name), &picture.image.data)?;
            rels.push(("rId2", "image", format!("../media/{}", name)));
        }
        let rels: Vec<(&str, &str, &str)> = rels.iter().map(|(id, kind, t)| (*id, *kind, t.as_str())).collect();
        put(&mut zip, &format!("ppt/slides/slide{}.xml", number), content_slide(slide).as_bytes())?;
        put(
            &mut zip,
            &format!("ppt/slides/_rels/slide{}.xml.rels", number),
            relationships(&rels).as_bytes(),
        )?;
    }

    zip.finish().map_err(zip_error)
}

/// Escape text for XML content and attributes, dropping control characters
/// XML cannot carry.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < ' ' => {}
            c => out.push(c),
        }
    }
    out
}

fn content_types(slides: usize) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Default Extension="gif" ContentType="image/gif"/><Default Extension="bmp" ContentType="image/bmp"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#
    );
    for n in 1..=slides {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
    )
}

/// `(id, relationship type suffix, target)` triples as a rels part.
fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    for (id, kind, target) in rels {
        let _ = write!(
            xml,
            r#"<Relationship Id="{id}" Type="{REL_NS}/{kind}" Target="{}"/>"#,
            escape(target)
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn presentation(slides: usize) -> String {
    let mut ids = String::new();
    for n in 0..slides {
        let _ = write!(ids, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + n, n + 2);
    }
    format!(
        r#"{XML_DECL}<p:presentation {NS} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/><p:notesSz cx="{SLIDE_HEIGHT}" cy="{SLIDE_WIDTH}"/></p:presentation>"#
    )
}

fn presentation_rels(slides: usize) -> String {
    let targets: Vec<(String, &str, String)> = std::iter::once((
        "rId1".to_string(),
        "slideMaster",
        "slideMasters/slideMaster1.xml".to_string(),
    ))
    .chain((1..=slides).map(|n| (format!("rId{}", n + 1), "slide", format!("slides/slide{}.xml", n))))
    .chain(std::iter::once((
        format!("rId{}", slides + 2),
        "theme",
        "theme/theme1.xml".to_string(),
    )))
    .collect();
    let rels: Vec<(&str, &str, &str)> = targets
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    relationships(&rels)
}

const GROUP_HEADER: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout {NS} type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn slide(shapes: &str) -> String {
    format!(
        r#"{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{GROUP_HEADER}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

#[derive(Clone, Copy)]
struct Rect {
    x: u64,
    y: u64,
    cx: u64,
    cy: u64,
}

fn xfrm(r: Rect) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        r.x, r.y, r.cx, r.cy
    )
}

/// One run of text; `size` is in points.
fn run(text: &str, size: u32, bold: bool, color: &str) -> String {
    format!(
        r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r>"#,
        size * 100,
        u8::from(bold),
        color,
        escape(text)
    )
}

fn text_box(id: usize, name: &str, area: Rect, paragraphs: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        xfrm(area)
    )
}

fn title_slide(deck: &Deck) -> String {
    let title = text_box(
        2,
        "Title",
        Rect { x: inches(0.5), y: inches(2.5), cx: inches(9.0), cy: inches(1.5) },
        &format!(
            r#"<a:p><a:pPr algn="ctr"/>{}</a:p>"#,
            run(&deck.title, 44, true, TITLE_COLOR)
        ),
    );
    let subtitle = text_box(
        3,
        "Subtitle",
        Rect { x: inches(0.5), y: inches(4.2), cx: inches(9.0), cy: inches(1.0) },
        &format!(
            r#"<a:p><a:pPr algn="ctr"/>{}</a:p>"#,
            run(&deck.subtitle, 20, false, BODY_COLOR)
        ),
    );
    slide(&format!("{}{}", title, subtitle))
}

fn content_slide(content: &DeckSlide) -> String {
    let mut shapes = text_box(
        2,
        "Title",
        Rect { x: inches(0.5), y: inches(0.5), cx: inches(9.0), cy: inches(1.0) },
        &format!("<a:p>{}</a:p>", run(&content.title, 32, true, TITLE_COLOR)),
    );

    let _ = write!(
        shapes,
        r#"<p:cxnSp><p:nvCxnSpPr><p:cNvPr id="3" name="Divider"/><p:cNvCxnSpPr/><p:nvPr/></p:nvCxnSpPr><p:spPr>{}<a:prstGeom prst="line"><a:avLst/></a:prstGeom><a:ln w="{DIVIDER_WIDTH}"><a:solidFill><a:srgbClr val="{ACCENT_COLOR}"/></a:solidFill></a:ln></p:spPr></p:cxnSp>"#,
        xfrm(Rect { x: inches(0.5), y: inches(1.4), cx: inches(9.0), cy: 0 })
    );

    let text_width = match content.picture.as_ref().map(|p| p.placement) {
        Some(Placement::Beside) => inches(4.5),
        _ => inches(9.0),
    };
    let mut bullets = String::new();
    for bullet in &content.bullets {
        let _ = write!(
            bullets,
            r#"<a:p><a:pPr marL="285750" indent="-285750"><a:lnSpc><a:spcPct val="120000"/></a:lnSpc><a:spcBef><a:spcPts val="1200"/></a:spcBef><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>{}</a:p>"#,
            run(bullet, 18, false, BODY_COLOR)
        );
    }
    if bullets.is_empty() {
        bullets.push_str("<a:p/>");
    }
    shapes.push_str(&text_box(
        4,
        "Content",
        Rect { x: inches(0.5), y: inches(2.0), cx: text_width, cy: inches(5.0) },
        &bullets,
    ));

    if let Some(picture) = &content.picture {
        let frame = match picture.placement {
            Placement::Beside => Rect { x: inches(5.5), y: inches(2.0), cx: inches(4.0), cy: inches(4.5) },
            Placement::Corner => Rect { x: inches(7.0), y: inches(4.5), cx: inches(2.5), cy: inches(2.75) },
        };
        let area = fit(&picture.image, frame);
        let _ = write!(
            shapes,
            r#"<p:pic><p:nvPicPr><p:cNvPr id="5" name="Picture"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            xfrm(area)
        );
    }

    slide(&shapes)
}

/// Largest rectangle with the image's aspect ratio inside `frame`, anchored
/// at the frame's top-left corner.
fn fit(image: &SlideImage, frame: Rect) -> Rect {
    let (w, h) = (u64::from(image.width), u64::from(image.height));
    if w == 0 || h == 0 {
        return frame;
    }
    let (cx, cy) = if w * frame.cy > h * frame.cx {
        (frame.cx, h * frame.cx / w)
    } else {
        (w * frame.cy / h, frame.cy)
    };
    Rect { cx, cy, ..frame }
}

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::io::{Cursor, Read};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn read_part(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut xml = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    fn deck(picture: Option<Picture>) -> Deck {
        Deck {
            title: "Rust & <Safety>".into(),
            subtitle: "Auto-generated presentation".into(),
            slides: vec![
                DeckSlide {
                    title: "Ownership".into(),
                    bullets: vec!["Moves".into(), "Borrows".into()],
                    picture,
                },
                DeckSlide {
                    title: "Lifetimes".into(),
                    bullets: Vec::new(),
                    picture: None,
                },
            ],
        }
    }

    #[test]
    fn test_package_layout() {
        let image = SlideImage::from_bytes(png(40, 20)).unwrap();
        let deck = deck(Some(Picture { image, placement: Placement::Beside }));
        assert_eq!(deck.num_slides(), 3);
        assert_eq!(deck.num_images(), 1);

        let bytes = write_pptx(&deck, Cursor::new(Vec::new())).unwrap().into_inner();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "ppt/presentation.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide3.xml",
            "ppt/media/image1.png",
        ] {
            assert!(archive.by_name(part).is_ok(), "missing {}", part);
        }

        let cover = read_part(&mut archive, "ppt/slides/slide1.xml");
        assert!(cover.contains("Rust &amp; &lt;Safety&gt;"));
        assert!(cover.contains(r#"sz="4400""#));

        let content = read_part(&mut archive, "ppt/slides/slide2.xml");
        assert!(content.contains("<a:t>Borrows</a:t>"));
        assert!(content.contains(r#"r:embed="rId2""#));
        // 40x20 picture in the 4in x 4.5in frame is width-bound.
        assert!(content.contains(r#"<a:off x="5029200" y="1828800"/><a:ext cx="3657600" cy="1828800"/>"#));
        // Bullets narrow to 4.5in beside the picture.
        assert!(content.contains(r#"<a:ext cx="4114800" cy="4572000"/>"#));

        let rels = read_part(&mut archive, "ppt/slides/_rels/slide2.xml.rels");
        assert!(rels.contains("../media/image1.png"));
        let presentation = read_part(&mut archive, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 3);
    }

    #[test]
    fn test_corner_picture_keeps_full_width_text() {
        let image = SlideImage::from_bytes(png(10, 30)).unwrap();
        let deck = deck(Some(Picture { image, placement: Placement::Corner }));
        let bytes = write_pptx(&deck, Cursor::new(Vec::new())).unwrap().into_inner();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let content = read_part(&mut archive, "ppt/slides/slide2.xml");
        assert!(content.contains(r#"<a:ext cx="8229600" cy="4572000"/>"#));
        // Tall picture is bound by the 2.75in frame height.
        assert!(content.contains(r#"<a:off x="6400800" y="4114800"/><a:ext cx="838200" cy="2514600"/>"#));
    }

    #[test]
    fn test_render_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        render_pptx(&deck(None), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.file_names().all(|name| !name.starts_with("ppt/media/")));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape("bell\u{7}\ttab"), "bell\ttab");
    }

    #[test]
    fn test_slide_image_formats() {
        let image = SlideImage::from_bytes(png(3, 2)).unwrap();
        assert_eq!((image.extension, image.width, image.height), ("png", 3, 2));
        assert!(SlideImage::from_bytes(vec![0x89, b'P', b'N', b'G']).is_none());
        assert!(SlideImage::from_bytes(b"plain text".to_vec()).is_none());
    }
}
