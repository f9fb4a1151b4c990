use super::{DataRecord, RandomAccessDataset};
use crate::{
    collate::{Batch, BatchCollator},
    common::*,
};

/// Streams dataset items while preserving index order.
///
/// Items are produced on blocking threads with bounded concurrency, so file
/// decode and augmentation run off the consumer task.
#[derive(Debug)]
pub struct RandomAccessStream<D>
where
    D: 'static + RandomAccessDataset,
{
    dataset: Arc<D>,
    workers: usize,
}

impl<D> RandomAccessStream<D>
where
    D: 'static + RandomAccessDataset,
{
    /// Wraps a dataset. `workers` defaults to the number of CPUs.
    pub fn new(dataset: D, workers: impl Into<Option<usize>>) -> Self {
        Self {
            dataset: Arc::new(dataset),
            workers: workers.into().unwrap_or_else(num_cpus::get).max(1),
        }
    }

    /// One ordered pass over the dataset.
    pub fn stream(&self) -> impl Stream<Item = Result<D::Item>> + Send {
        let dataset = self.dataset.clone();
        let num_records = dataset.num_records();

        stream::iter(0..num_records)
            .map(move |index| {
                let dataset = dataset.clone();
                async_std::task::spawn_blocking(move || dataset.nth(index))
            })
            .buffered(self.workers)
    }
}

/// Chunks an item stream and collates each chunk in the consumer task.
///
/// Collation is stateful (the multiscale schedule), so the collator lives
/// inside the stream and is never shared.
pub fn batch_stream(
    items: impl Stream<Item = Result<DataRecord>> + Send,
    collator: BatchCollator,
    batch_size: NonZeroUsize,
) -> impl Stream<Item = Result<Batch>> + Send {
    items
        .chunks(batch_size.get())
        .scan(collator, |collator, results| {
            let batch = results
                .into_iter()
                .try_collect()
                .and_then(|items: Vec<_>| collator.collate(items));
            future::ready(Some(batch))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collate::BatchCollatorInit;

    #[derive(Debug)]
    struct ZeroDataset {
        count: usize,
    }

    impl RandomAccessDataset for ZeroDataset {
        type Item = DataRecord;

        fn num_records(&self) -> usize {
            self.count
        }

        fn nth(&self, index: usize) -> Result<DataRecord> {
            let index = index % self.count;
            Ok(DataRecord {
                path: PathBuf::from(format!("{}.png", index)),
                image: Tensor::zeros(&[3, 16, 16], FLOAT_CPU),
                labels: None,
            })
        }
    }

    #[async_std::test]
    async fn item_stream_preserves_order() {
        let stream = RandomAccessStream::new(ZeroDataset { count: 5 }, 3);
        let items: Vec<_> = stream.stream().try_collect().await.unwrap();
        let paths: Vec<_> = items.iter().map(|item| item.path.clone()).collect();
        assert_eq!(
            paths,
            (0..5)
                .map(|index| PathBuf::from(format!("{}.png", index)))
                .collect::<Vec<_>>()
        );
    }

    #[async_std::test]
    async fn batch_stream_collates_chunks() {
        let stream = RandomAccessStream::new(ZeroDataset { count: 4 }, 2);
        let collator = BatchCollatorInit {
            image_size: 32,
            multiscale: false,
            seed: None,
        }
        .build()
        .unwrap();

        let batches: Vec<_> = batch_stream(
            stream.stream(),
            collator,
            NonZeroUsize::new(2).unwrap(),
        )
        .try_collect()
        .await
        .unwrap();

        assert_eq!(batches.len(), 2);
        for batch in &batches {
            assert_eq!(batch.images.size(), [2, 3, 32, 32]);
            assert!(batch.targets.is_none());
        }
    }
}
