use std::collections::hash_map::Entry;

use addrsync_core::{EntityKind, IntegrityError, IntegrityResult, RoadId};

use super::AddressProjection;
use crate::entity::Road;
use crate::events::{RoadCreated, RoadEvent};

impl AddressProjection {
    pub(super) fn apply_road(&mut self, event: &RoadEvent) -> IntegrityResult<()> {
        let event_type = event.event_type();

        match event {
            RoadEvent::Created(e) => self.create_road(e, event_type),
            RoadEvent::NameChanged(e) => self.change_road(e.id, event_type, |r| r.name = e.name.clone()),
            RoadEvent::ExternalIdChanged(e) => {
                self.change_road(e.id, event_type, |r| r.external_id = e.external_id.clone())
            }
            RoadEvent::Updated(e) => self.change_road(e.id, event_type, |r| {
                r.external_id = e.external_id.clone();
                r.name = e.name.clone();
            }),
            RoadEvent::Deleted(e) => self.change_road(e.id, event_type, |r| r.deleted = true),
        }
    }

    fn create_road(&mut self, e: &RoadCreated, event_type: &'static str) -> IntegrityResult<()> {
        match self.roads.entry(e.id) {
            Entry::Occupied(_) => Err(IntegrityError::duplicate(EntityKind::Road, e.id, event_type)),
            Entry::Vacant(slot) => {
                slot.insert(Road {
                    external_id: e.external_id.clone(),
                    name: e.name.clone(),
                    deleted: false,
                });
                Ok(())
            }
        }
    }

    fn change_road(
        &mut self,
        id: RoadId,
        event_type: &'static str,
        change: impl FnOnce(&mut Road),
    ) -> IntegrityResult<()> {
        let road = self
            .roads
            .get_mut(&id)
            .ok_or_else(|| IntegrityError::missing(EntityKind::Road, id, event_type))?;
        change(road);
        Ok(())
    }
}
