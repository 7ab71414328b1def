use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use addrsync_core::{EntityKind, IntegrityError, IntegrityResult, UnitAddressId};

use super::AddressProjection;
use crate::entity::UnitAddress;
use crate::events::{UnitAddressCreated, UnitAddressEvent};

impl AddressProjection {
    pub(super) fn apply_unit_address(
        &mut self,
        event: &UnitAddressEvent,
        at: DateTime<Utc>,
    ) -> IntegrityResult<()> {
        use UnitAddressEvent as Ev;

        let event_type = event.event_type();
        let id = event.id();
        let changed = Some(at);

        match event {
            Ev::Created(e) => self.create_unit_address(e, event_type, at),
            Ev::ExternalIdChanged(e) => self.change_unit_address(id, event_type, changed, |u| {
                u.external_id = e.external_id.clone()
            }),
            Ev::AccessAddressIdChanged(e) => self.change_unit_address(id, event_type, changed, |u| {
                u.access_address_id = e.access_address_id
            }),
            Ev::StatusChanged(e) => {
                self.change_unit_address(id, event_type, changed, |u| u.status = e.status)
            }
            Ev::FloorNameChanged(e) => self.change_unit_address(id, event_type, changed, |u| {
                u.floor_name = e.floor_name.clone()
            }),
            Ev::SuiteNameChanged(e) => self.change_unit_address(id, event_type, changed, |u| {
                u.suite_name = e.suite_name.clone()
            }),
            Ev::Updated(e) => self.change_unit_address(id, event_type, changed, |u| {
                u.external_id = e.external_id.clone();
                u.access_address_id = e.access_address_id;
                u.status = e.status;
                u.floor_name = e.floor_name.clone();
                u.suite_name = e.suite_name.clone();
            }),
            Ev::Deleted(_) => {
                let touched = self.delete_time(at);
                self.change_unit_address(id, event_type, touched, |u| u.deleted = true)
            }
        }
    }

    fn create_unit_address(
        &mut self,
        e: &UnitAddressCreated,
        event_type: &'static str,
        at: DateTime<Utc>,
    ) -> IntegrityResult<()> {
        match self.unit_addresses.entry(e.id) {
            Entry::Occupied(_) => Err(IntegrityError::duplicate(
                EntityKind::UnitAddress,
                e.id,
                event_type,
            )),
            Entry::Vacant(slot) => {
                slot.insert(UnitAddress {
                    access_address_id: e.access_address_id,
                    status: e.status,
                    floor_name: e.floor_name.clone(),
                    suite_name: e.suite_name.clone(),
                    external_id: e.external_id.clone(),
                    created_at: at,
                    updated_at: None,
                    deleted: false,
                });
                Ok(())
            }
        }
    }

    fn change_unit_address(
        &mut self,
        id: UnitAddressId,
        event_type: &'static str,
        at: Option<DateTime<Utc>>,
        change: impl FnOnce(&mut UnitAddress),
    ) -> IntegrityResult<()> {
        let unit = self
            .unit_addresses
            .get_mut(&id)
            .ok_or_else(|| IntegrityError::missing(EntityKind::UnitAddress, id, event_type))?;
        change(unit);
        if let Some(at) = at {
            unit.touch(at);
        }
        Ok(())
    }
}
