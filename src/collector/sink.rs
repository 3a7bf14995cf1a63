//! Bounded measurement channel between unit tasks and the consumer.
//!
//! Any number of [`MeasurementSink`] clones write into one
//! [`MeasurementStream`]. The stream ends once every sink clone has been
//! dropped, and a write fails with [`SinkClosed`] once the stream is gone, so no
//! producer waits on a consumer that stopped reading.

use thiserror::Error;
use tokio::sync::mpsc;

use super::Measurement;

/// The consumer side of the sink was dropped or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("measurement sink closed")]
pub struct SinkClosed;

/// Create a sink/stream pair holding at most `capacity` buffered measurements.
pub fn channel(capacity: usize) -> (MeasurementSink, MeasurementStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MeasurementSink { tx }, MeasurementStream { rx })
}

/// Producer handle. Cheap to clone, one clone per unit task.
#[derive(Debug, Clone)]
pub struct MeasurementSink {
    tx: mpsc::Sender<Measurement>,
}

impl MeasurementSink {
    /// Send one measurement, waiting for buffer space.
    pub async fn send(&self, measurement: Measurement) -> Result<(), SinkClosed> {
        self.tx.send(measurement).await.map_err(|_| SinkClosed)
    }

    /// Forward measurements in order. Stops at the first failed write.
    pub async fn send_all(
        &self,
        measurements: impl IntoIterator<Item = Measurement>,
    ) -> Result<usize, SinkClosed> {
        let mut sent = 0;
        for measurement in measurements {
            self.send(measurement).await?;
            sent += 1;
        }
        Ok(sent)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle.
#[derive(Debug)]
pub struct MeasurementStream {
    rx: mpsc::Receiver<Measurement>,
}

impl MeasurementStream {
    /// Next measurement, or `None` once every producer is gone.
    pub async fn next(&mut self) -> Option<Measurement> {
        self.rx.recv().await
    }

    /// Drain until every producer is gone.
    pub async fn collect_all(mut self) -> Vec<Measurement> {
        let mut out = Vec::new();
        while let Some(m) = self.rx.recv().await {
            out.push(m);
        }
        out
    }

    /// Stop accepting writes. Buffered measurements can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_ends_when_all_sinks_drop() {
        let (sink, stream) = channel(4);
        sink.send(Measurement::gauge("hana_y", "y", 1.0)).await.unwrap();

        let other = sink.clone();
        let producer = tokio::spawn(async move {
            other
                .send_all((0..10).map(|i| Measurement::gauge("hana_x", "x", i as f64)))
                .await
        });
        drop(sink);

        let all = stream.collect_all().await;
        assert_eq!(producer.await.unwrap(), Ok(10));
        assert_eq!(all.len(), 11);

        let xs: Vec<f64> = all.iter().filter(|m| m.name == "hana_x").map(|m| m.value).collect();
        assert_eq!(xs, (0..10).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_producer_fails_after_consumer_drops() {
        let (sink, stream) = channel(1);
        drop(stream);
        assert!(sink.is_closed());
        assert_eq!(
            sink.send(Measurement::gauge("hana_x", "x", 1.0)).await,
            Err(SinkClosed)
        );
    }

    #[tokio::test]
    async fn test_blocked_producer_released_by_close() {
        let (sink, mut stream) = channel(1);
        sink.send(Measurement::gauge("hana_x", "x", 1.0)).await.unwrap();

        let blocked = tokio::spawn({
            let sink = sink.clone();
            async move { sink.send(Measurement::gauge("hana_x", "x", 2.0)).await }
        });
        tokio::task::yield_now().await;
        stream.close();

        assert_eq!(blocked.await.unwrap(), Err(SinkClosed));
        assert_eq!(stream.next().await.map(|m| m.value), Some(1.0));
    }
}
