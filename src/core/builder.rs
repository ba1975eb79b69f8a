//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Discovers, fetches and evaluates every module reachable from a root directory.

use crate::core::fetch::runner::Runner;
use crate::core::fetch::{self, error::FetchError, FetchSettings};
use crate::core::manifest::inherit;
use crate::core::manifest::value::OptionMap;
use crate::core::module::{self, Module, ModuleId};
use crate::core::pool::ModulePool;
use crate::error::{Error, Hint};
use crate::util::filesystem::Standardize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;

/// A module waiting to be placed on disk and evaluated by a worker.
struct Job {
    id: ModuleId,
    module: Module,
    origin: PathBuf,
    context: OptionMap,
    fetch: bool,
}

/// What a worker learned about a module.
struct Done {
    id: ModuleId,
    revision: Option<String>,
    options: OptionMap,
}

pub struct Builder<'a> {
    settings: &'a FetchSettings,
    runner: &'a dyn Runner,
    jobs: usize,
    cancel: AtomicBool,
}

impl<'a> Builder<'a> {
    pub fn new(settings: &'a FetchSettings, runner: &'a dyn Runner) -> Self {
        Self {
            settings: settings,
            runner: runner,
            jobs: 1,
            cancel: AtomicBool::new(false),
        }
    }

    /// Sets the maximum number of modules fetched at the same time.
    pub fn jobs(mut self, n: usize) -> Self {
        self.jobs = n.max(1);
        self
    }

    /// Stops every running and future fetch.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Builds the pool of every module reachable from the module at `root`.
    pub fn materialize(&self, root: &Path) -> Result<ModulePool, Error> {
        if root.is_dir() == false {
            return Err(Error::MissingRoot(root.to_path_buf()));
        }
        let mut top = Module::root(&PathBuf::standardize(root));
        top.evaluate(OptionMap::new())?;
        let mut pool = ModulePool::new(top);
        self.run_pre_hook(&pool, 0)?;

        let mut queue = self.discover(&mut pool, 0)?;
        while queue.is_empty() == false {
            let round = std::mem::take(&mut queue);
            tracing::debug!("fetching a round of {} module(s)", round.len());
            for done in self.dispatch(round)? {
                if let Some(m) = pool.get_mut(done.id) {
                    m.set_fetched(done.revision);
                    m.set_options(done.options);
                }
                self.run_pre_hook(&pool, done.id)?;
                queue.extend(self.discover(&mut pool, done.id)?);
            }
        }

        for id in pool.walk().into_iter().rev() {
            if let Some(m) = pool.get(id) {
                if let Some((cmd, dir)) = m.get_fetch_post_cmd().zip(m.get_path()) {
                    fetch::run_hook(cmd, dir, self.runner, &self.cancel)
                        .map_err(|e| Error::Fetch(m.to_string(), e, Hint::VerboseLog))?;
                }
            }
        }

        let missing: Vec<String> = pool
            .iter()
            .filter(|(_, m)| m.is_fetched() == false)
            .map(|(_, m)| m.get_url().to_string())
            .collect();
        match missing.is_empty() {
            true => Ok(pool),
            false => Err(Error::Unfetched(missing)),
        }
    }

    fn run_pre_hook(&self, pool: &ModulePool, id: ModuleId) -> Result<(), Error> {
        if let Some(m) = pool.get(id) {
            if let Some((cmd, dir)) = m.get_fetch_pre_cmd().zip(m.get_path()) {
                fetch::run_hook(cmd, dir, self.runner, &self.cancel)
                    .map_err(|e| Error::Fetch(m.to_string(), e, Hint::VerboseLog))?;
            }
        }
        Ok(())
    }

    /// Turns the references of an evaluated module into jobs for the modules
    /// not yet in the pool.
    fn discover(&self, pool: &mut ModulePool, id: ModuleId) -> Result<Vec<Job>, Error> {
        let (refs, origin, fetchto, context) = match pool.get(id) {
            Some(parent) => (
                parent.get_references(),
                parent.get_path().cloned().unwrap_or_default(),
                parent.get_fetchto(),
                parent.get_options().map(inherit).unwrap_or_default(),
            ),
            None => return Ok(Vec::new()),
        };
        let mut jobs = Vec::new();
        for r in refs {
            let candidate = Module::from_ref(&r, id, &origin, &fetchto)
                .map_err(|e| Error::Fetch(r.url.clone(), e, Hint::ModuleUrl))?;
            if let Some(existing) = pool.find(candidate.get_url()) {
                tracing::debug!("skipping {} since it is already in the pool", candidate);
                pool.link(id, existing);
                continue;
            }
            let resident = candidate
                .is_resident()
                .map_err(|e| Error::Fetch(candidate.to_string(), e, Hint::ModuleUrl))?;
            if resident == true {
                tracing::debug!("found {} on disk", candidate);
            }
            let child = match pool.insert(candidate.clone()) {
                Some(c) => c,
                None => continue,
            };
            jobs.push(Job {
                id: child,
                module: candidate,
                origin: origin.clone(),
                context: context.clone(),
                fetch: resident == false,
            });
        }
        Ok(jobs)
    }

    /// Runs a round of jobs on up to `jobs` scoped worker threads.
    ///
    /// The first failure cancels the remaining work; every worker is joined
    /// before the error is returned.
    fn dispatch(&self, mut round: Vec<Job>) -> Result<Vec<Done>, Error> {
        // workers pop from the back
        round.reverse();
        let workers = self.jobs.min(round.len());
        let queue = Mutex::new(round);
        let (tx, rx) = mpsc::channel::<Result<Done, Error>>();

        thread::scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                s.spawn(move || loop {
                    if self.cancel.load(Ordering::SeqCst) == true {
                        break;
                    }
                    let job = match queue.lock() {
                        Ok(mut q) => q.pop(),
                        Err(_) => None,
                    };
                    let job = match job {
                        Some(j) => j,
                        None => break,
                    };
                    let result = self.work(job);
                    if result.is_err() == true {
                        self.cancel.store(true, Ordering::SeqCst);
                    }
                    if tx.send(result).is_err() == true {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let mut done = Vec::new();
        let mut errors = Vec::new();
        for result in rx {
            match result {
                Ok(d) => done.push(d),
                Err(e) => errors.push(e),
            }
        }
        // report the failure that caused the cancellation, not its echoes
        let first = errors
            .iter()
            .position(|e| matches!(e, Error::Fetch(_, FetchError::Cancelled(_, _), _)) == false)
            .unwrap_or(0);
        if errors.is_empty() == false {
            return Err(errors.swap_remove(first));
        }
        if self.cancel.load(Ordering::SeqCst) == true {
            return Err(Error::Cancelled);
        }
        done.sort_by_key(|d| d.id);
        Ok(done)
    }

    fn work(&self, job: Job) -> Result<Done, Error> {
        let revision = match job.fetch {
            true => fetch::fetch(&job.module, &job.origin, self.settings, self.runner, &self.cancel)
                .map_err(|e| Error::Fetch(job.module.to_string(), e, Hint::VerboseLog))?,
            false => None,
        };
        let dir = job.module.get_path().cloned().unwrap_or_default();
        let options = module::evaluate_dir(&dir, job.context)?;
        Ok(Done {
            id: job.id,
            revision: revision,
            options: options,
        })
    }
}
