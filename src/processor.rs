use std::sync::Arc;

use crossbeam_channel::{select, Receiver, RecvError, Sender};
use jod_thread::JoinHandle;

use crate::delta::ResourceDelta;
use crate::dispatch::UpdateDispatcher;
use crate::model::DeltaClassifier;

/// Consumes change-delta trees from the provider's notification channel on a
/// background thread, classifies them, and hands the resulting batches to
/// the dispatcher.
///
/// Consumers communicate with this object via channels; dropping it joins
/// the thread after signaling shutdown.
pub struct DeltaProcessor {
    /// Signaled before dropping so the processing loop terminates instead of
    /// hanging forever.
    shutdown_sender: Sender<()>,

    /// Dropping this joins the processing thread.
    #[allow(unused)]
    job_thread: JoinHandle<Result<(), RecvError>>,
}

impl DeltaProcessor {
    pub(crate) fn start(
        classifier: DeltaClassifier,
        dispatcher: Arc<UpdateDispatcher>,
        delta_receiver: Receiver<ResourceDelta>,
    ) -> Self {
        let (shutdown_sender, shutdown_receiver) = crossbeam_channel::bounded(1);

        let job_thread = jod_thread::Builder::new()
            .name("DeltaProcessor thread".to_owned())
            .spawn(move || {
                log::trace!("DeltaProcessor thread started");

                loop {
                    select! {
                        recv(delta_receiver) -> delta => {
                            let delta = delta?;
                            log::trace!(
                                "processing delta for {}",
                                delta.resource.path.display()
                            );
                            let ops = classifier.classify(&delta);
                            dispatcher.dispatch(ops);
                        },
                        recv(shutdown_receiver) -> _ => {
                            log::trace!("DeltaProcessor shutdown signal received...");
                            return Ok(());
                        },
                    }
                }
            })
            .expect("Could not start DeltaProcessor thread");

        Self {
            shutdown_sender,
            job_thread,
        }
    }
}

impl Drop for DeltaProcessor {
    fn drop(&mut self) {
        let _ = self.shutdown_sender.send(());
    }
}
