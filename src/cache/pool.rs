use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use blake3::Hash;
use crossbeam::channel::{self, Receiver, Sender};

use crate::expr::CompiledPredicate;
use crate::registry::ZoneId;
use crate::sampler::SampleGrid;

use super::ZoneGeometry;

/// One zone build, captured at dispatch time.
#[derive(Debug, Clone)]
pub struct BuildJob {
    pub zone_id: ZoneId,
    pub version: u64,
    pub generation: u64,
    pub key: Hash,
    pub predicate: Arc<CompiledPredicate>,
    pub grid: SampleGrid,
    pub max_vertices: usize,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub zone_id: ZoneId,
    pub version: u64,
    pub generation: u64,
    pub key: Hash,
    pub geometry: ZoneGeometry,
}

/// Fixed set of worker threads building zone geometry off the caller's
/// thread. Builds are pure, so workers share nothing but the channels.
pub struct RecomputePool {
    jobs: Option<Sender<BuildJob>>,
    results: Receiver<BuildOutcome>,
    workers: Vec<JoinHandle<()>>,
    in_flight: usize,
}

impl RecomputePool {
    pub fn new(workers: usize) -> io::Result<Self> {
        let (job_tx, job_rx) = channel::unbounded::<BuildJob>();
        let (result_tx, result_rx) = channel::unbounded::<BuildOutcome>();

        let mut handles = Vec::with_capacity(workers.max(1));
        for index in 0..workers.max(1) {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("zone-build-{index}"))
                .spawn(move || build_worker(jobs, results))?;
            handles.push(handle);
        }

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            workers: handles,
            in_flight: 0,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue a build. Returns false if the workers are gone.
    pub fn submit(&mut self, job: BuildJob) -> bool {
        let Some(jobs) = &self.jobs else {
            return false;
        };
        if jobs.send(job).is_err() {
            return false;
        }
        self.in_flight += 1;
        true
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Finished builds available right now.
    pub fn try_collect(&mut self) -> Vec<BuildOutcome> {
        let mut done = Vec::new();
        while let Ok(outcome) = self.results.try_recv() {
            done.push(outcome);
        }
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    /// Block until every queued build has finished.
    pub fn wait_all(&mut self) -> Vec<BuildOutcome> {
        let mut done = Vec::with_capacity(self.in_flight);
        while self.in_flight > 0 {
            match self.results.recv() {
                Ok(outcome) => {
                    done.push(outcome);
                    self.in_flight -= 1;
                }
                Err(_) => {
                    self.in_flight = 0;
                }
            }
        }
        done
    }
}

impl Drop for RecomputePool {
    fn drop(&mut self) {
        // closing the job channel ends each worker loop
        self.jobs.take();
        for handle in self.workers.drain(..) {
            handle.join().ok();
        }
    }
}

fn build_worker(jobs: Receiver<BuildJob>, results: Sender<BuildOutcome>) {
    for job in jobs {
        let geometry = ZoneGeometry::build(&job.predicate, &job.grid, job.max_vertices);
        let outcome = BuildOutcome {
            zone_id: job.zone_id,
            version: job.version,
            generation: job.generation,
            key: job.key,
            geometry,
        };
        if results.send(outcome).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cache_key;
    use crate::expr::compile;

    fn job(zone_id: &str, text: &str) -> BuildJob {
        let grid = SampleGrid::default();
        BuildJob {
            zone_id: zone_id.into(),
            version: 1,
            generation: 0,
            key: cache_key(text, &grid, 25),
            predicate: Arc::new(compile(text).unwrap()),
            grid,
            max_vertices: 25,
        }
    }

    #[test]
    fn builds_every_submitted_job() {
        let mut pool = RecomputePool::new(3).unwrap();
        assert_eq!(pool.worker_count(), 3);
        for (id, text) in [("a", "x > 0"), ("b", "y > 0"), ("c", "x > 1000")] {
            assert!(pool.submit(job(id, text)));
        }
        let mut done = pool.wait_all();
        assert_eq!(pool.in_flight(), 0);
        done.sort_by(|l, r| l.zone_id.cmp(&r.zone_id));
        let ids: Vec<_> = done.iter().map(|o| o.zone_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(done[2].geometry.is_empty());
        assert_eq!(done[0].geometry.polygon.len(), 4);
    }

    #[test]
    fn zero_workers_still_spawns_one() {
        let mut pool = RecomputePool::new(0).unwrap();
        assert_eq!(pool.worker_count(), 1);
        pool.submit(job("a", "x > 0"));
        assert_eq!(pool.wait_all().len(), 1);
        assert!(pool.try_collect().is_empty());
    }
}
