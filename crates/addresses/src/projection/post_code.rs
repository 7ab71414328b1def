use std::collections::hash_map::Entry;

use addrsync_core::{EntityKind, IntegrityError, IntegrityResult, PostCodeId};

use super::AddressProjection;
use crate::entity::PostCode;
use crate::events::{PostCodeCreated, PostCodeEvent};

impl AddressProjection {
    pub(super) fn apply_post_code(&mut self, event: &PostCodeEvent) -> IntegrityResult<()> {
        let event_type = event.event_type();

        match event {
            PostCodeEvent::Created(e) => self.create_post_code(e, event_type),
            PostCodeEvent::NameChanged(e) => {
                self.change_post_code(e.id, event_type, |p| p.name = e.name.clone())
            }
            PostCodeEvent::Updated(e) => {
                self.change_post_code(e.id, event_type, |p| p.name = e.name.clone())
            }
            PostCodeEvent::Deleted(e) => self.change_post_code(e.id, event_type, |p| p.deleted = true),
        }
    }

    fn create_post_code(&mut self, e: &PostCodeCreated, event_type: &'static str) -> IntegrityResult<()> {
        match self.post_codes.entry(e.id) {
            Entry::Occupied(_) => Err(IntegrityError::duplicate(EntityKind::PostCode, e.id, event_type)),
            Entry::Vacant(slot) => {
                slot.insert(PostCode {
                    code: e.code.clone(),
                    name: e.name.clone(),
                    deleted: false,
                });
                Ok(())
            }
        }
    }

    fn change_post_code(
        &mut self,
        id: PostCodeId,
        event_type: &'static str,
        change: impl FnOnce(&mut PostCode),
    ) -> IntegrityResult<()> {
        let post_code = self
            .post_codes
            .get_mut(&id)
            .ok_or_else(|| IntegrityError::missing(EntityKind::PostCode, id, event_type))?;
        change(post_code);
        Ok(())
    }
}
