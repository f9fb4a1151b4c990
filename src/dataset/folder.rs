use super::{load_rgb_image, ImageRecord, RandomAccessDataset};
use crate::{common::*, processor};

/// [ImageFolderDataset] configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFolderInit {
    /// Directory of unlabeled images.
    pub folder: PathBuf,
    /// Resize target in pixels.
    #[serde(default = "default_image_size")]
    pub image_size: usize,
}

fn default_image_size() -> usize {
    416
}

impl ImageFolderInit {
    pub fn build(self) -> Result<ImageFolderDataset> {
        let Self { folder, image_size } = self;
        ensure!(image_size > 0, "image_size must be positive");

        let pattern = format!("{}/*.*", folder.display());
        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .with_context(|| format!("invalid glob pattern '{}'", pattern))?
            .try_collect()?;
        files.sort();
        ensure!(!files.is_empty(), "no images found in '{}'", folder.display());

        Ok(ImageFolderDataset {
            files,
            image_size: image_size as i64,
        })
    }
}

/// Inference-only dataset over a directory of images. Items run
/// decode -> pad-to-square -> resize, no labels, no augmentation.
#[derive(Debug)]
pub struct ImageFolderDataset {
    files: Vec<PathBuf>,
    image_size: i64,
}

impl RandomAccessDataset for ImageFolderDataset {
    type Item = ImageRecord;

    fn num_records(&self) -> usize {
        self.files.len()
    }

    fn nth(&self, index: usize) -> Result<ImageRecord> {
        let index = index % self.files.len();
        let path = &self.files[index];

        let image = load_rgb_image(path)?;
        let (image, _padding) = processor::pad_to_square(&image)?;
        let image = processor::resize(&image, self.image_size)?;

        Ok(ImageRecord {
            path: path.clone(),
            image,
        })
    }
}
