//! Batch assembly and the multiscale resize schedule.

use crate::{common::*, dataset::DataRecord, processor};
use getset::CopyGetters;

/// Bounds of the multiscale resolution set `{320, 352, ..., 608}`.
pub const MULTISCALE_MIN_SIZE: i64 = 320;
pub const MULTISCALE_MAX_SIZE: i64 = 608;
pub const MULTISCALE_SIZE_STEP: i64 = 32;
/// A new resolution is drawn every this many batches.
pub const MULTISCALE_PERIOD: usize = 10;

/// [BatchCollator] configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCollatorInit {
    /// Initial resize target in pixels.
    #[serde(default = "default_image_size")]
    pub image_size: usize,
    /// Enables the periodic resolution re-draw.
    #[serde(default = "default_multiscale")]
    pub multiscale: bool,
    /// Seeds the resolution RNG for reproducible schedules.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_image_size() -> usize {
    416
}

fn default_multiscale() -> bool {
    true
}

impl BatchCollatorInit {
    pub fn build(self) -> Result<BatchCollator> {
        let Self {
            image_size,
            multiscale,
            seed,
        } = self;
        ensure!(image_size > 0, "image_size must be positive");

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(BatchCollator {
            image_size: image_size as i64,
            multiscale,
            batch_count: 0,
            rng,
        })
    }
}

/// A collated batch.
#[derive(Debug, TensorLike)]
pub struct Batch {
    #[tensor_like(clone)]
    pub paths: Vec<PathBuf>,
    /// `[batch, channel, size, size]` image tensor.
    pub images: Tensor,
    /// `[num_boxes, 6]` rows of `[batch_index, class, cx, cy, w, h]`, or
    /// `None` when no image in the batch contributed a box.
    pub targets: Option<Tensor>,
}

/// Assembles independently produced items into uniform batches.
///
/// One collator serves one consumer. The batch counter and RNG are
/// unsynchronized, so concurrent `collate` calls would break the
/// one-resolution-per-batch guarantee.
#[derive(Debug, CopyGetters)]
pub struct BatchCollator {
    /// The resize target applied to the most recent batch.
    #[getset(get_copy = "pub")]
    image_size: i64,
    multiscale: bool,
    /// The number of completed `collate` calls.
    #[getset(get_copy = "pub")]
    batch_count: usize,
    rng: StdRng,
}

impl BatchCollator {
    /// Collates a batch of items that all succeeded earlier pipeline stages.
    ///
    /// Every image is resized to one shared resolution and surviving labels
    /// are concatenated into a single target tensor. `batch_index` refers to
    /// the image's position in the stacked tensor, zero-box images included.
    pub fn collate(&mut self, items: Vec<DataRecord>) -> Result<Batch> {
        ensure!(!items.is_empty(), "cannot collate an empty batch");

        let (paths, images, label_sets) = items
            .into_iter()
            .map(|record| {
                let DataRecord {
                    path,
                    image,
                    labels,
                } = record;
                (path, image, labels)
            })
            .unzip_n_vec();

        if self.multiscale && self.batch_count % MULTISCALE_PERIOD == 0 {
            let num_sizes = (MULTISCALE_MAX_SIZE - MULTISCALE_MIN_SIZE) / MULTISCALE_SIZE_STEP + 1;
            self.image_size =
                MULTISCALE_MIN_SIZE + self.rng.gen_range(0..num_sizes) * MULTISCALE_SIZE_STEP;
            debug!("multiscale target set to {}", self.image_size);
        }

        let rows: Vec<f32> = izip!(0.., &label_sets)
            .flat_map(|(batch_index, labels)| {
                labels.iter().flatten().map(move |label| {
                    [
                        batch_index as f32,
                        label.class as f32,
                        label.cx.raw() as f32,
                        label.cy.raw() as f32,
                        label.w.raw() as f32,
                        label.h.raw() as f32,
                    ]
                })
            })
            .flatten()
            .collect();
        let targets = if rows.is_empty() {
            None
        } else {
            Some(Tensor::of_slice(&rows).view([-1, 6]))
        };

        let images: Vec<Tensor> = images
            .iter()
            .map(|image| processor::resize(image, self.image_size))
            .try_collect()?;
        let images = Tensor::stack(&images, 0);

        self.batch_count += 1;

        Ok(Batch {
            paths,
            images,
            targets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::BoxLabel;

    fn record(name: &str, labels: Option<Vec<BoxLabel>>) -> DataRecord {
        DataRecord {
            path: PathBuf::from(name),
            image: Tensor::zeros(&[3, 32, 32], FLOAT_CPU),
            labels,
        }
    }

    fn one_box(class: i64, cx: f64) -> BoxLabel {
        BoxLabel {
            class,
            cy: r64(0.5),
            cx: r64(cx),
            h: r64(0.1),
            w: r64(0.1),
        }
    }

    #[test]
    fn multiscale_schedule_changes_only_at_period_boundaries() {
        let mut collator = BatchCollatorInit {
            image_size: 416,
            multiscale: true,
            seed: Some(42),
        }
        .build()
        .unwrap();

        let mut sizes = vec![];
        for _ in 0..25 {
            let batch = collator
                .collate(vec![record("a.png", None), record("b.png", None)])
                .unwrap();
            let size = collator.image_size();
            assert_eq!(batch.images.size(), [2, 3, size, size]);
            sizes.push(size);
        }

        for (call, &size) in sizes.iter().enumerate() {
            assert!(
                (MULTISCALE_MIN_SIZE..=MULTISCALE_MAX_SIZE).contains(&size)
                    && (size - MULTISCALE_MIN_SIZE) % MULTISCALE_SIZE_STEP == 0
            );
            // within a 10-call window the resolution is frozen
            assert_eq!(size, sizes[call / MULTISCALE_PERIOD * MULTISCALE_PERIOD]);
        }
    }

    #[test]
    fn seeded_schedules_are_reproducible() {
        let draw_sizes = |seed| {
            let mut collator = BatchCollatorInit {
                image_size: 416,
                multiscale: true,
                seed: Some(seed),
            }
            .build()
            .unwrap();
            (0..30)
                .map(|_| {
                    collator.collate(vec![record("a.png", None)]).unwrap();
                    collator.image_size()
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(draw_sizes(7), draw_sizes(7));
    }

    #[test]
    fn fixed_scale_keeps_the_configured_size() {
        let mut collator = BatchCollatorInit {
            image_size: 416,
            multiscale: false,
            seed: None,
        }
        .build()
        .unwrap();

        for _ in 0..12 {
            let batch = collator.collate(vec![record("a.png", None)]).unwrap();
            assert_eq!(batch.images.size(), [1, 3, 416, 416]);
        }
    }

    #[test]
    fn all_empty_annotation_sets_collate_to_no_targets() {
        let mut collator = BatchCollatorInit {
            image_size: 64,
            multiscale: false,
            seed: None,
        }
        .build()
        .unwrap();

        let batch = collator
            .collate(vec![
                record("a.png", None),
                record("b.png", None),
                record("c.png", None),
            ])
            .unwrap();

        assert!(batch.targets.is_none());
        assert_eq!(batch.images.size(), [3, 3, 64, 64]);
        assert_eq!(batch.paths.len(), 3);
    }

    #[test]
    fn batch_index_follows_the_stacked_image_position() {
        let mut collator = BatchCollatorInit {
            image_size: 64,
            multiscale: false,
            seed: None,
        }
        .build()
        .unwrap();

        // the second image has no labels, the third has an empty label file
        let batch = collator
            .collate(vec![
                record("a.png", Some(vec![one_box(0, 0.2)])),
                record("b.png", None),
                record("c.png", Some(vec![])),
                record("d.png", Some(vec![one_box(1, 0.4), one_box(2, 0.6)])),
            ])
            .unwrap();

        let targets = batch.targets.unwrap();
        assert_eq!(targets.size(), [3, 6]);

        let rows = Vec::<f32>::from(&targets);
        // batch_index column references the stacked tensor, not the filtered
        // enumeration, so the boxes of the 4th image carry index 3
        assert_eq!(rows[0], 0.0);
        assert_eq!(rows[6], 3.0);
        assert_eq!(rows[12], 3.0);
        // class column
        assert_eq!(rows[1], 0.0);
        assert_eq!(rows[7], 1.0);
        assert_eq!(rows[13], 2.0);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let mut collator = BatchCollatorInit {
            image_size: 64,
            multiscale: false,
            seed: None,
        }
        .build()
        .unwrap();
        assert!(collator.collate(vec![]).is_err());
    }
}
