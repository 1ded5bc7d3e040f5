use crate::community::Community;
use pulse_common::story::{PROGRESS_TICK, StoryPosition, StoryViewer};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PlaybackControl {
    Next,
    Previous,
    Close,
}

/// What the story overlay renders.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct PlaybackState {
    /// `None` once the viewer has closed.
    pub position: Option<StoryPosition>,
    /// Percent of the current story shown, `0.0..=100.0`.
    pub progress: f64,
}

/// Runs a [`StoryViewer`] on the progress clock and marks each story as
/// viewed the first time it is shown.
///
/// Dropping the playback stops it.
#[derive(Debug)]
pub struct StoryPlayback {
    state: watch::Receiver<PlaybackState>,
    controls: mpsc::UnboundedSender<PlaybackControl>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StoryPlayback {
    pub fn start(community: Arc<Community>, viewer: StoryViewer) -> Self {
        let (state_tx, state) = watch::channel(PlaybackState::default());
        let (controls, controls_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(drive(
            community,
            viewer,
            state_tx,
            controls_rx,
            cancel.clone(),
        ));

        Self {
            state,
            controls,
            cancel,
            task: Some(task),
        }
    }

    #[must_use]
    pub fn state(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    pub fn next(&self) {
        self.control(PlaybackControl::Next);
    }

    pub fn previous(&self) {
        self.control(PlaybackControl::Previous);
    }

    pub fn close(&self) {
        self.control(PlaybackControl::Close);
    }

    fn control(&self, control: PlaybackControl) {
        // Fails only after playback finished, when there is nothing to steer.
        let _ = self.controls.send(control);
    }

    /// Waits until the last story has played or the viewer was closed.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StoryPlayback {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drive(
    community: Arc<Community>,
    mut viewer: StoryViewer,
    state: watch::Sender<PlaybackState>,
    mut controls: mpsc::UnboundedReceiver<PlaybackControl>,
    cancel: CancellationToken,
) {
    let mut ticks = tokio::time::interval(PROGRESS_TICK);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let now = tokio::select! {
            () = cancel.cancelled() => break,
            now = ticks.tick() => {
                viewer.tick(now.into_std());
                now
            }
            Some(control) = controls.recv() => {
                let now = Instant::now();
                let event = match control {
                    PlaybackControl::Next => viewer.next(now.into_std()),
                    PlaybackControl::Previous => viewer.previous(now.into_std()),
                    PlaybackControl::Close => viewer.close(),
                };
                debug!(?control, ?event, "story control");
                now
            }
        };

        for story_id in viewer.take_view_marks() {
            let community = Arc::clone(&community);
            tokio::spawn(async move {
                // Failures are already reported as notices.
                let _ = community.mark_story_viewed(story_id).await;
            });
        }

        state.send_replace(PlaybackState {
            position: viewer.position(),
            progress: viewer.progress(now.into_std()),
        });
        if viewer.is_closed() {
            break;
        }
    }
}
