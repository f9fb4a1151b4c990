use super::{load_rgb_image, DataRecord, RandomAccessDataset};
use crate::{
    common::*,
    label::{self, LabelPathMap},
    processor::{self, ColorJitter, ColorJitterInit},
};

/// [ListDataset] configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDatasetInit {
    /// Text file with one image path per line.
    pub list_file: PathBuf,
    /// Enables color jitter and random horizontal flip.
    #[serde(default = "default_augment")]
    pub augment: bool,
    /// Marks label geometry as normalized to the original image frame.
    /// When `false`, labels are absolute pixel coordinates.
    #[serde(default = "default_normalized_labels")]
    pub normalized_labels: bool,
    /// Image-path to label-path substitutions.
    #[serde(default)]
    pub label_map: LabelPathMap,
    /// Color jitter bounds used when `augment` is set.
    #[serde(default)]
    pub color_jitter: ColorJitterInit,
}

fn default_augment() -> bool {
    true
}

fn default_normalized_labels() -> bool {
    true
}

impl ListDatasetInit {
    pub fn build(self) -> Result<ListDataset> {
        let Self {
            list_file,
            augment,
            normalized_labels,
            label_map,
            color_jitter,
        } = self;

        let content = std::fs::read_to_string(&list_file)
            .with_context(|| format!("failed to read image list '{}'", list_file.display()))?;
        let image_files: Vec<PathBuf> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();
        ensure!(
            !image_files.is_empty(),
            "image list '{}' is empty",
            list_file.display()
        );

        // the list ordering is canonical for label-path derivation
        let label_files: Vec<PathBuf> = image_files
            .iter()
            .map(|path| label_map.derive(path))
            .try_collect()?;

        info!("loaded {} image paths from list", image_files.len());

        Ok(ListDataset {
            image_files,
            label_files,
            augment,
            normalized_labels,
            color_jitter: color_jitter.build(),
        })
    }
}

/// Training dataset over an image list with per-image text labels.
///
/// Each item runs decode -> optional color jitter -> pad-to-square ->
/// label remap -> optional horizontal flip.
#[derive(Debug)]
pub struct ListDataset {
    image_files: Vec<PathBuf>,
    label_files: Vec<PathBuf>,
    augment: bool,
    normalized_labels: bool,
    color_jitter: ColorJitter,
}

impl RandomAccessDataset for ListDataset {
    type Item = DataRecord;

    fn num_records(&self) -> usize {
        self.image_files.len()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        let index = index % self.image_files.len();
        let image_path = &self.image_files[index];
        let label_path = &self.label_files[index];

        let image = load_rgb_image(image_path)?;
        let image = if self.augment {
            self.color_jitter.forward(&image)?
        } else {
            image
        };

        let (_channels, orig_height, orig_width) = image.size3()?;
        let (image, padding) = processor::pad_to_square(&image)?;

        // a missing label file is not an error, the item carries no labels
        let labels = if label_path.is_file() {
            let raw = label::parse_label_file(label_path)?;
            Some(label::to_padded_frame(
                &raw,
                padding,
                orig_height,
                orig_width,
                self.normalized_labels,
            ))
        } else {
            debug!("no label file for '{}'", image_path.display());
            None
        };

        let (image, labels) = if self.augment && StdRng::from_entropy().gen_bool(0.5) {
            processor::horizontal_flip(&image, labels)
        } else {
            (image, labels)
        };

        Ok(DataRecord {
            path: image_path.clone(),
            image,
            labels,
        })
    }
}
