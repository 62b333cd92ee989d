use crate::app_config::ActorConfig;
use crate::{ServiceError, ServiceResult};
use paxalloc_engine::{
    AllocationSession, AssignOutcome, AutoFillReport, ManifestData, OperationalData, RosterSources,
    SessionError, TripInfo,
};
use paxalloc_resources::{ContainerKind, Layout, SlotBatch};
use paxalloc_roster::Passenger;
use paxalloc_shared::{AllocationEvent, AllocationSpace, ContainerId, PassengerId, SlotId, SlotRef};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Assign { passenger_id: PassengerId, target: SlotRef, reply: Reply<AssignOutcome> },
    RemoveFromSlot { target: SlotRef, passenger_id: PassengerId, reply: Reply<bool> },
    Select { passenger_id: PassengerId, reply: Reply<()> },
    PlaceSelected { target: SlotRef, reply: Reply<AssignOutcome> },
    ClearSelection,
    BeginDrag { passenger_id: PassengerId, reply: Reply<()> },
    DropOn { target: SlotRef, reply: Reply<AssignOutcome> },
    CancelDrag,
    AutoFill { container_id: ContainerId, reply: Reply<AutoFillReport> },
    AddContainer { kind: ContainerKind, name: String, layout: Layout, reply: Reply<ContainerId> },
    RenameContainer { container_id: ContainerId, name: String, reply: Reply<()> },
    RemoveContainer { container_id: ContainerId, reply: Reply<Vec<PassengerId>> },
    AddSlots { container_id: ContainerId, batch: SlotBatch, reply: Reply<Vec<SlotId>> },
    RemoveSlot { target: SlotRef, reply: Reply<Vec<PassengerId>> },
    AddManualPassenger { name: String, document: Option<String>, reply: oneshot::Sender<PassengerId> },
    RemoveManualPassenger { passenger_id: PassengerId, reply: oneshot::Sender<bool> },
    SetNameOverride { passenger_id: PassengerId, name: Option<String>, reply: Reply<()> },
    ReplaceSources { sources: RosterSources, reply: oneshot::Sender<()> },
    Unassigned { space: AllocationSpace, reply: oneshot::Sender<Vec<Passenger>> },
    Assignments { space: AllocationSpace, reply: oneshot::Sender<BTreeMap<PassengerId, SlotRef>> },
    ContainerIds { space: AllocationSpace, reply: oneshot::Sender<Vec<ContainerId>> },
    Snapshot { reply: oneshot::Sender<OperationalData> },
    Manifest { trip: TripInfo, reply: oneshot::Sender<ManifestData> },
}

/// Owns one `AllocationSession` on a tokio task. Commands are handled one
/// at a time, so every entry point is a critical section over the stores.
pub struct AllocationActor {
    session: AllocationSession,
    receiver: mpsc::Receiver<Command>,
    events: broadcast::Sender<AllocationEvent>,
}

impl AllocationActor {
    /// Start the actor and return a handle to it. The task stops once every
    /// handle has been dropped.
    pub fn spawn(mut session: AllocationSession, config: &ActorConfig) -> AllocationHandle {
        let (sender, receiver) = mpsc::channel(config.command_buffer);
        let (snapshots, _) = broadcast::channel(config.snapshot_buffer);
        let (events, _) = broadcast::channel(config.event_buffer);

        // events recorded while loading describe no change to subscribers
        let loaded = session.drain_events();
        tracing::debug!("Discarding {} load-time events", loaded.len());

        let snapshot_tx = snapshots.clone();
        let session = session.with_sink(move |snapshot: &OperationalData| {
            // no subscribers is not an error
            let _ = snapshot_tx.send(Arc::new(snapshot.clone()));
        });

        let actor = AllocationActor {
            session,
            receiver,
            events: events.clone(),
        };
        tokio::spawn(actor.run());

        AllocationHandle {
            sender,
            snapshots,
            events,
        }
    }

    async fn run(mut self) {
        tracing::info!("Allocation actor started");
        while let Some(command) = self.receiver.recv().await {
            self.handle(command);
            for event in self.session.drain_events() {
                let _ = self.events.send(event);
            }
        }
        tracing::info!("Allocation actor stopped");
    }

    fn handle(&mut self, command: Command) {
        let session = &mut self.session;
        // a dropped reply receiver means the caller gave up; nothing to do
        match command {
            Command::Assign { passenger_id, target, reply } => {
                let _ = reply.send(session.attempt_assign(&passenger_id, &target));
            }
            Command::RemoveFromSlot { target, passenger_id, reply } => {
                let _ = reply.send(session.remove_from_slot(&target.container_id, &target.slot_id, &passenger_id));
            }
            Command::Select { passenger_id, reply } => {
                let _ = reply.send(session.select_passenger(&passenger_id));
            }
            Command::PlaceSelected { target, reply } => {
                let _ = reply.send(session.place_selected(&target));
            }
            Command::ClearSelection => session.clear_selection(),
            Command::BeginDrag { passenger_id, reply } => {
                let _ = reply.send(session.begin_drag(&passenger_id));
            }
            Command::DropOn { target, reply } => {
                let _ = reply.send(session.drop_on(&target));
            }
            Command::CancelDrag => session.cancel_drag(),
            Command::AutoFill { container_id, reply } => {
                let _ = reply.send(session.auto_fill(&container_id));
            }
            Command::AddContainer { kind, name, layout, reply } => {
                let _ = reply.send(session.add_container(kind, &name, &layout));
            }
            Command::RenameContainer { container_id, name, reply } => {
                let _ = reply.send(session.rename_container(&container_id, &name));
            }
            Command::RemoveContainer { container_id, reply } => {
                let _ = reply.send(session.remove_container(&container_id));
            }
            Command::AddSlots { container_id, batch, reply } => {
                let _ = reply.send(session.add_slots(&container_id, &batch));
            }
            Command::RemoveSlot { target, reply } => {
                let _ = reply.send(session.remove_slot(&target.container_id, &target.slot_id));
            }
            Command::AddManualPassenger { name, document, reply } => {
                let _ = reply.send(session.add_manual_passenger(&name, document));
            }
            Command::RemoveManualPassenger { passenger_id, reply } => {
                let _ = reply.send(session.remove_manual_passenger(&passenger_id));
            }
            Command::SetNameOverride { passenger_id, name, reply } => {
                let _ = reply.send(session.set_name_override(&passenger_id, name.as_deref()));
            }
            Command::ReplaceSources { sources, reply } => {
                session.replace_sources(sources);
                let _ = reply.send(());
            }
            Command::Unassigned { space, reply } => {
                let _ = reply.send(session.unassigned(space).into_iter().cloned().collect());
            }
            Command::Assignments { space, reply } => {
                let _ = reply.send(session.assignments_snapshot(space));
            }
            Command::ContainerIds { space, reply } => {
                let ids = session.containers(space).iter().map(|c| c.id.clone()).collect();
                let _ = reply.send(ids);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(session.operational_data());
            }
            Command::Manifest { trip, reply } => {
                let _ = reply.send(session.manifest(&trip));
            }
        }
    }
}

/// Cloneable front door to a running `AllocationActor`
#[derive(Clone)]
pub struct AllocationHandle {
    sender: mpsc::Sender<Command>,
    snapshots: broadcast::Sender<Arc<OperationalData>>,
    events: broadcast::Sender<AllocationEvent>,
}

impl AllocationHandle {
    /// Snapshots published after every mutation, for persistence
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<Arc<OperationalData>> {
        self.snapshots.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AllocationEvent> {
        self.events.subscribe()
    }

    pub async fn assign(&self, passenger_id: PassengerId, target: SlotRef) -> ServiceResult<AssignOutcome> {
        Ok(self.request(|reply| Command::Assign { passenger_id, target, reply }).await??)
    }

    pub async fn remove_from_slot(&self, target: SlotRef, passenger_id: PassengerId) -> ServiceResult<bool> {
        Ok(self.request(|reply| Command::RemoveFromSlot { target, passenger_id, reply }).await??)
    }

    pub async fn select(&self, passenger_id: PassengerId) -> ServiceResult<()> {
        Ok(self.request(|reply| Command::Select { passenger_id, reply }).await??)
    }

    pub async fn place_selected(&self, target: SlotRef) -> ServiceResult<AssignOutcome> {
        Ok(self.request(|reply| Command::PlaceSelected { target, reply }).await??)
    }

    pub async fn clear_selection(&self) -> ServiceResult<()> {
        self.send(Command::ClearSelection).await
    }

    pub async fn begin_drag(&self, passenger_id: PassengerId) -> ServiceResult<()> {
        Ok(self.request(|reply| Command::BeginDrag { passenger_id, reply }).await??)
    }

    pub async fn drop_on(&self, target: SlotRef) -> ServiceResult<AssignOutcome> {
        Ok(self.request(|reply| Command::DropOn { target, reply }).await??)
    }

    pub async fn cancel_drag(&self) -> ServiceResult<()> {
        self.send(Command::CancelDrag).await
    }

    pub async fn auto_fill(&self, container_id: ContainerId) -> ServiceResult<AutoFillReport> {
        Ok(self.request(|reply| Command::AutoFill { container_id, reply }).await??)
    }

    pub async fn add_container(&self, kind: ContainerKind, name: String, layout: Layout) -> ServiceResult<ContainerId> {
        Ok(self.request(|reply| Command::AddContainer { kind, name, layout, reply }).await??)
    }

    pub async fn rename_container(&self, container_id: ContainerId, name: String) -> ServiceResult<()> {
        Ok(self.request(|reply| Command::RenameContainer { container_id, name, reply }).await??)
    }

    pub async fn remove_container(&self, container_id: ContainerId) -> ServiceResult<Vec<PassengerId>> {
        Ok(self.request(|reply| Command::RemoveContainer { container_id, reply }).await??)
    }

    pub async fn add_slots(&self, container_id: ContainerId, batch: SlotBatch) -> ServiceResult<Vec<SlotId>> {
        Ok(self.request(|reply| Command::AddSlots { container_id, batch, reply }).await??)
    }

    pub async fn remove_slot(&self, target: SlotRef) -> ServiceResult<Vec<PassengerId>> {
        Ok(self.request(|reply| Command::RemoveSlot { target, reply }).await??)
    }

    pub async fn add_manual_passenger(&self, name: String, document: Option<String>) -> ServiceResult<PassengerId> {
        self.request(|reply| Command::AddManualPassenger { name, document, reply }).await
    }

    pub async fn remove_manual_passenger(&self, passenger_id: PassengerId) -> ServiceResult<bool> {
        self.request(|reply| Command::RemoveManualPassenger { passenger_id, reply }).await
    }

    pub async fn set_name_override(&self, passenger_id: PassengerId, name: Option<String>) -> ServiceResult<()> {
        Ok(self.request(|reply| Command::SetNameOverride { passenger_id, name, reply }).await??)
    }

    pub async fn replace_sources(&self, sources: RosterSources) -> ServiceResult<()> {
        self.request(|reply| Command::ReplaceSources { sources, reply }).await
    }

    pub async fn unassigned(&self, space: AllocationSpace) -> ServiceResult<Vec<Passenger>> {
        self.request(|reply| Command::Unassigned { space, reply }).await
    }

    pub async fn assignments(&self, space: AllocationSpace) -> ServiceResult<BTreeMap<PassengerId, SlotRef>> {
        self.request(|reply| Command::Assignments { space, reply }).await
    }

    pub async fn container_ids(&self, space: AllocationSpace) -> ServiceResult<Vec<ContainerId>> {
        self.request(|reply| Command::ContainerIds { space, reply }).await
    }

    pub async fn snapshot(&self) -> ServiceResult<OperationalData> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn manifest(&self, trip: TripInfo) -> ServiceResult<ManifestData> {
        self.request(|reply| Command::Manifest { trip, reply }).await
    }

    async fn send(&self, command: Command) -> ServiceResult<()> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ServiceError::ActorClosed)
    }

    async fn request<T, F>(&self, build: F) -> ServiceResult<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> Command,
    {
        let (reply, response) = oneshot::channel();
        self.send(build(reply)).await?;
        response.await.map_err(|_| ServiceError::ActorClosed)
    }
}
