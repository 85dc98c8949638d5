use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    analytics::PerformanceRecord, catalog::Niche, pipeline::Video, PipelineError, Result,
};

use super::{Session, SessionSnapshot};

/// Thread-safe handle over one [`Session`]. Every call holds the session
/// lock for its whole duration, so status transitions and record replacement
/// never interleave.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn connect(&self, endpoint: &str) -> Result<()> {
        self.lock()?.connect(endpoint)
    }

    pub fn discover(&self, limit: usize) -> Result<Vec<Niche>> {
        self.lock()?.discover(limit)
    }

    pub fn generate_content(&self, niche_id: u64) -> Result<Video> {
        self.lock()?.generate_content(niche_id)
    }

    pub fn produce(&self, video_id: u64) -> Result<Video> {
        self.lock()?.produce(video_id)
    }

    pub fn publish(&self, video_id: u64) -> Result<Video> {
        self.lock()?.publish(video_id)
    }

    pub fn measure(&self, video_id: Option<u64>) -> Result<Vec<PerformanceRecord>> {
        self.lock()?.measure(video_id)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        Ok(self.lock()?.snapshot())
    }

    /// Runs `f` with exclusive access to the session.
    pub fn with<T>(&self, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let mut session = self.lock()?;
        Ok(f(&mut session))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session>> {
        self.inner
            .lock()
            .map_err(|_| PipelineError::Poisoned("session registry"))
    }
}

impl std::fmt::Debug for SharedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSession").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_publishers_only_publish_once() {
        let shared = SharedSession::new(Session::default());
        shared.connect("https://colab.example/nb").unwrap();
        let niche_id = shared.discover(1).unwrap()[0].id;
        let video = shared.generate_content(niche_id).unwrap();
        shared.produce(video.id).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.publish(video.id).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);

        let records = shared.measure(None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(shared.with(|s| s.performance().len()).unwrap(), 1);
    }
}
