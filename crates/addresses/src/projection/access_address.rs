use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use addrsync_core::{AccessAddressId, EntityKind, IntegrityError, IntegrityResult};

use super::AddressProjection;
use crate::entity::AccessAddress;
use crate::events::{AccessAddressCreated, AccessAddressEvent};

impl AddressProjection {
    pub(super) fn apply_access_address(
        &mut self,
        event: &AccessAddressEvent,
        at: DateTime<Utc>,
    ) -> IntegrityResult<()> {
        use AccessAddressEvent as Ev;

        let event_type = event.event_type();
        let id = event.id();
        let changed = Some(at);

        match event {
            Ev::Created(e) => self.create_access_address(e, event_type, at),
            Ev::ExternalIdChanged(e) => self.change_access_address(id, event_type, changed, |a| {
                a.external_id = e.external_id.clone()
            }),
            Ev::MunicipalCodeChanged(e) => self.change_access_address(id, event_type, changed, |a| {
                a.municipal_code = e.municipal_code.clone()
            }),
            Ev::StatusChanged(e) => {
                self.change_access_address(id, event_type, changed, |a| a.status = e.status)
            }
            Ev::RoadCodeChanged(e) => self.change_access_address(id, event_type, changed, |a| {
                a.road_code = e.road_code.clone()
            }),
            Ev::HouseNumberChanged(e) => self.change_access_address(id, event_type, changed, |a| {
                a.house_number = e.house_number.clone()
            }),
            Ev::CoordinateChanged(e) => self.change_access_address(id, event_type, changed, |a| {
                a.east_coordinate = e.east_coordinate;
                a.north_coordinate = e.north_coordinate;
            }),
            Ev::TownNameChanged(e) => self.change_access_address(id, event_type, changed, |a| {
                a.town_name = e.town_name.clone()
            }),
            Ev::PlotIdChanged(e) => self.change_access_address(id, event_type, changed, |a| {
                a.plot_id = e.plot_id.clone()
            }),
            Ev::RoadIdChanged(e) => {
                self.change_access_address(id, event_type, changed, |a| a.road_id = e.road_id)
            }
            Ev::PostCodeIdChanged(e) => self.change_access_address(id, event_type, changed, |a| {
                a.post_code_id = e.post_code_id
            }),
            Ev::Updated(e) => self.change_access_address(id, event_type, changed, |a| {
                a.external_id = e.external_id.clone();
                a.municipal_code = e.municipal_code.clone();
                a.status = e.status;
                a.road_code = e.road_code.clone();
                a.house_number = e.house_number.clone();
                a.east_coordinate = e.east_coordinate;
                a.north_coordinate = e.north_coordinate;
                a.town_name = e.town_name.clone();
                a.plot_id = e.plot_id.clone();
                a.road_id = e.road_id;
                a.post_code_id = e.post_code_id;
            }),
            Ev::Deleted(_) => {
                let touched = self.delete_time(at);
                self.change_access_address(id, event_type, touched, |a| a.deleted = true)
            }
        }
    }

    fn create_access_address(
        &mut self,
        e: &AccessAddressCreated,
        event_type: &'static str,
        at: DateTime<Utc>,
    ) -> IntegrityResult<()> {
        match self.access_addresses.entry(e.id) {
            Entry::Occupied(_) => Err(IntegrityError::duplicate(
                EntityKind::AccessAddress,
                e.id,
                event_type,
            )),
            Entry::Vacant(slot) => {
                slot.insert(AccessAddress {
                    external_id: e.external_id.clone(),
                    municipal_code: e.municipal_code.clone(),
                    status: e.status,
                    road_code: e.road_code.clone(),
                    house_number: e.house_number.clone(),
                    east_coordinate: e.east_coordinate,
                    north_coordinate: e.north_coordinate,
                    town_name: e.town_name.clone(),
                    plot_id: e.plot_id.clone(),
                    road_id: e.road_id,
                    post_code_id: e.post_code_id,
                    created_at: at,
                    updated_at: None,
                    deleted: false,
                });
                Ok(())
            }
        }
    }

    /// Mutate an existing record in place and advance its `updated_at`.
    fn change_access_address(
        &mut self,
        id: AccessAddressId,
        event_type: &'static str,
        at: Option<DateTime<Utc>>,
        change: impl FnOnce(&mut AccessAddress),
    ) -> IntegrityResult<()> {
        let address = self
            .access_addresses
            .get_mut(&id)
            .ok_or_else(|| IntegrityError::missing(EntityKind::AccessAddress, id, event_type))?;
        change(address);
        if let Some(at) = at {
            address.touch(at);
        }
        Ok(())
    }
}
