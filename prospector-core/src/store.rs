//! Job store: shared, in-memory registry of research jobs.

use crate::types::Job;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage seam for jobs. The pipeline and the HTTP surface only ever see
/// this trait, so tests can substitute instrumented stores.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<Job>;
    async fn put(&self, job: Job);
    async fn delete(&self, id: &str) -> bool;
    /// All jobs, newest first.
    async fn list(&self) -> Vec<Job>;
}

/// Plain map-backed store. Job fields are only ever written by one task at a
/// time (the pipeline task, or the one request handling a follow-up), so a
/// read-write lock around the map is sufficient. Concurrent follow-up
/// requests against the same job can still race on the question counter;
/// that is a known, accepted limitation.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    async fn put(&self, job: Job) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    async fn delete(&self, id: &str) -> bool {
        self.jobs.write().await.remove(id).is_some()
    }

    async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobKind, JobStatus};

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = InMemoryJobStore::new();
        let job = Job::new(JobKind::Research, "Acme");
        let id = job.id.clone();
        store.put(job).await;

        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.query, "Acme");
        assert_eq!(fetched.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemoryJobStore::new();
        assert!(store.get("no-such-id").await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = InMemoryJobStore::new();
        let mut job = Job::new(JobKind::Research, "Acme");
        let id = job.id.clone();
        store.put(job.clone()).await;

        job.status = JobStatus::Completed;
        store.put(job).await;
        assert_eq!(store.get(&id).await.unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryJobStore::new();
        let job = Job::new(JobKind::Research, "Acme");
        let id = job.id.clone();
        store.put(job).await;

        assert!(store.delete(&id).await);
        assert!(!store.delete(&id).await);
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryJobStore::new();
        let mut first = Job::new(JobKind::Research, "First");
        let mut second = Job::new(JobKind::Research, "Second");
        first.created_at = chrono::Utc::now() - chrono::Duration::seconds(10);
        second.created_at = chrono::Utc::now();
        store.put(first).await;
        store.put(second).await;

        let jobs = store.list().await;
        assert_eq!(jobs[0].query, "Second");
        assert_eq!(jobs[1].query, "First");
    }
}
