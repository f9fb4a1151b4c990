//! Annotation types, label file parsing and the padded-frame codec.
//!
//! A label file stores one object per line as whitespace-separated
//! `class cx cy w h`, the geometry normalized to the original image frame
//! unless the dataset is configured for absolute pixel labels.

use crate::{common::*, processor::Padding};

/// One labeled box. Geometry is normalized to the current image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxLabel {
    pub class: i64,
    pub cy: R64,
    pub cx: R64,
    pub h: R64,
    pub w: R64,
}

/// Parses a label file into box records.
///
/// Blank lines are skipped. A malformed line fails the whole file.
pub fn parse_label_file(path: impl AsRef<Path>) -> Result<Vec<BoxLabel>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read label file '{}'", path.display()))?;

    let labels: Vec<_> = content
        .lines()
        .enumerate()
        .filter(|(_lineno, line)| !line.trim().is_empty())
        .map(|(lineno, line)| {
            parse_label_line(line)
                .with_context(|| format!("invalid label at {}:{}", path.display(), lineno + 1))
        })
        .try_collect()?;

    Ok(labels)
}

fn parse_label_line(line: &str) -> Result<BoxLabel> {
    let fields: Vec<_> = line.split_whitespace().collect();
    ensure!(
        fields.len() == 5,
        "expect 5 fields, but get {}",
        fields.len()
    );

    let class: i64 = fields[0]
        .parse()
        .with_context(|| format!("invalid class id '{}'", fields[0]))?;
    let geometry: Vec<R64> = fields[1..]
        .iter()
        .map(|field| -> Result<_> {
            let value: f64 = field
                .parse()
                .with_context(|| format!("invalid coordinate '{}'", field))?;
            R64::try_new(value).ok_or_else(|| format_err!("non-finite coordinate '{}'", field))
        })
        .try_collect()?;
    let [cx, cy, w, h] = match *geometry.as_slice() {
        [cx, cy, w, h] => [cx, cy, w, h],
        _ => unreachable!(),
    };

    Ok(BoxLabel { class, cy, cx, h, w })
}

/// Remaps labels from the original frame into the padded square frame.
///
/// Padding is asymmetric per axis, so box corners are shifted by the padding
/// offset in pixel space before re-normalizing to the square frame.
pub fn to_padded_frame(
    labels: &[BoxLabel],
    padding: Padding,
    orig_height: i64,
    orig_width: i64,
    normalized_labels: bool,
) -> Vec<BoxLabel> {
    let Padding {
        left,
        right,
        top,
        bottom,
    } = padding;
    let (h_factor, w_factor) = if normalized_labels {
        (orig_height as f64, orig_width as f64)
    } else {
        (1.0, 1.0)
    };
    let padded_h = (orig_height + top + bottom) as f64;
    let padded_w = (orig_width + left + right) as f64;

    labels
        .iter()
        .map(|&label| {
            let BoxLabel { class, cy, cx, h, w } = label;
            let (cx, cy, w, h) = (cx.raw(), cy.raw(), w.raw(), h.raw());

            // corners in the unpadded pixel frame, shifted by the padding
            let x1 = w_factor * (cx - w / 2.0) + left as f64;
            let x2 = w_factor * (cx + w / 2.0) + right as f64;
            let y1 = h_factor * (cy - h / 2.0) + top as f64;
            let y2 = h_factor * (cy + h / 2.0) + bottom as f64;

            let new = BoxLabel {
                class,
                cy: r64((y1 + y2) / 2.0 / padded_h),
                cx: r64((x1 + x2) / 2.0 / padded_w),
                h: r64(h * h_factor / padded_h),
                w: r64(w * w_factor / padded_w),
            };

            if !(0.0..=1.0).contains(&new.cx.raw()) || !(0.0..=1.0).contains(&new.cy.raw()) {
                warn!(
                    "box center ({}, {}) lies outside the padded frame",
                    new.cx, new.cy
                );
            }

            new
        })
        .collect()
}

/// Ordered substring substitutions deriving a label path from an image path.
///
/// A rule that does not match leaves the path unchanged, which may later
/// surface as a missing label file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPathMap {
    pub rules: Vec<(String, String)>,
}

impl Default for LabelPathMap {
    fn default() -> Self {
        let rules = [
            ("images", "labels"),
            ("JPEGImages", "labels"),
            (".png", ".txt"),
            (".jpg", ".txt"),
        ]
        .iter()
        .map(|&(needle, replacement)| (needle.to_owned(), replacement.to_owned()))
        .collect();
        Self { rules }
    }
}

impl LabelPathMap {
    pub fn derive(&self, image_path: &Path) -> Result<PathBuf> {
        let mut path = image_path
            .to_str()
            .ok_or_else(|| format_err!("non UTF-8 path '{}'", image_path.display()))?
            .to_owned();
        for (needle, replacement) in &self.rules {
            path = path.replace(needle.as_str(), replacement);
        }
        Ok(path.into())
    }
}
