use chrono::{Duration, TimeZone};
use proptest::prelude::*;
use uuid::Uuid;

use addrsync_core::EntityKind;
use addrsync_events::rebuild_from_scratch;

use super::*;
use crate::entity::AddressStatus;
use crate::events::*;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn envelope(position: u64, event: impl Into<AddressEvent>) -> EventEnvelope<AddressEvent> {
    let event = event.into();
    EventEnvelope::new(
        Uuid::now_v7(),
        Uuid::nil(),
        position,
        event.event_type(),
        t0() + Duration::minutes(position as i64),
        event,
    )
}

fn post_code_created(id: PostCodeId) -> PostCodeEvent {
    PostCodeCreated {
        id,
        code: "8000".to_string(),
        name: "Aarhus".to_string(),
    }
    .into()
}

fn road_created(id: RoadId) -> RoadEvent {
    RoadCreated {
        id,
        external_id: "R-1".to_string(),
        name: "Main St".to_string(),
    }
    .into()
}

fn access_address_created(id: AccessAddressId, road: RoadId, post: PostCodeId) -> AccessAddressEvent {
    AccessAddressCreated {
        id,
        external_id: Some("AA-1".to_string()),
        municipal_code: "0751".to_string(),
        status: AddressStatus::Active,
        road_code: "0042".to_string(),
        house_number: "12".to_string(),
        east_coordinate: 1.0,
        north_coordinate: 2.0,
        town_name: None,
        plot_id: None,
        road_id: road,
        post_code_id: post,
        external_created_date: None,
        external_updated_date: None,
    }
    .into()
}

fn unit_address_created(id: UnitAddressId, access: AccessAddressId) -> UnitAddressEvent {
    UnitAddressCreated {
        id,
        external_id: None,
        access_address_id: access,
        status: AddressStatus::Active,
        floor_name: Some("1".to_string()),
        suite_name: Some("tv".to_string()),
        external_created_date: None,
        external_updated_date: None,
    }
    .into()
}

struct Ids {
    post: PostCodeId,
    road: RoadId,
    access: AccessAddressId,
    unit: UnitAddressId,
}

fn seeded() -> (AddressProjection, Ids) {
    let ids = Ids {
        post: PostCodeId::new(),
        road: RoadId::new(),
        access: AccessAddressId::new(),
        unit: UnitAddressId::new(),
    };
    let mut projection = AddressProjection::default();
    projection.apply(&envelope(1, post_code_created(ids.post))).unwrap();
    projection.apply(&envelope(2, road_created(ids.road))).unwrap();
    projection
        .apply(&envelope(3, access_address_created(ids.access, ids.road, ids.post)))
        .unwrap();
    projection
        .apply(&envelope(4, unit_address_created(ids.unit, ids.access)))
        .unwrap();
    (projection, ids)
}

#[test]
fn create_inserts_one_record_per_family() {
    let (projection, ids) = seeded();

    assert_eq!(projection.sizes(), (1, 1, 1, 1));
    assert_eq!(projection.applied_events(), 4);

    let access = projection.access_address(&ids.access).unwrap();
    assert_eq!(access.status, AddressStatus::Active);
    assert_eq!((access.east_coordinate, access.north_coordinate), (1.0, 2.0));
    assert_eq!(access.created_at, t0() + Duration::minutes(3));
    assert_eq!(access.updated_at, None);
    assert!(!access.deleted);

    let road = projection.road(&ids.road).unwrap();
    assert_eq!(road.external_id, "R-1");
}

#[test]
fn duplicate_create_is_rejected() {
    let (mut projection, ids) = seeded();

    let err = projection
        .apply(&envelope(5, road_created(ids.road)))
        .unwrap_err();
    assert_eq!(
        err,
        IntegrityError::DuplicateKey {
            entity: EntityKind::Road,
            id: ids.road.into(),
            event_type: "RoadCreated",
        }
    );
    assert_eq!(projection.applied_events(), 4);
}

#[test]
fn change_or_delete_of_unknown_id_is_rejected() {
    let (mut projection, _) = seeded();
    let stranger = AccessAddressId::new();

    let err = projection
        .apply(&envelope(
            5,
            AccessAddressHouseNumberChanged {
                id: stranger,
                house_number: "14".to_string(),
                external_updated_date: None,
            },
        ))
        .unwrap_err();
    assert_eq!(
        err,
        IntegrityError::missing(EntityKind::AccessAddress, stranger, "AccessAddressHouseNumberChanged")
    );

    let missing_unit = UnitAddressId::new();
    let err = projection
        .apply(&envelope(
            6,
            UnitAddressDeleted {
                id: missing_unit,
                external_updated_date: None,
            },
        ))
        .unwrap_err();
    assert_eq!(err.entity(), Some(EntityKind::UnitAddress));
    assert!(projection.unit_address(&missing_unit).is_none());
}

#[test]
fn field_change_touches_only_that_field_and_updated_at() {
    let (mut projection, ids) = seeded();
    let before = projection.access_address(&ids.access).unwrap().clone();

    projection
        .apply(&envelope(
            10,
            AccessAddressStatusChanged {
                id: ids.access,
                status: AddressStatus::Discontinued,
                external_updated_date: None,
            },
        ))
        .unwrap();

    let after = projection.access_address(&ids.access).unwrap();
    assert_eq!(after.status, AddressStatus::Discontinued);
    assert_eq!(after.updated_at, Some(t0() + Duration::minutes(10)));
    assert_eq!(
        AccessAddress {
            status: before.status,
            updated_at: before.updated_at,
            ..after.clone()
        },
        before
    );
}

#[test]
fn coordinate_change_keeps_east_north_order() {
    let (mut projection, ids) = seeded();

    projection
        .apply(&envelope(
            5,
            AccessAddressCoordinateChanged {
                id: ids.access,
                east_coordinate: 600000.0,
                north_coordinate: 6200000.0,
                external_updated_date: None,
            },
        ))
        .unwrap();

    let access = projection.access_address(&ids.access).unwrap();
    assert_eq!(access.east_coordinate, 600000.0);
    assert_eq!(access.north_coordinate, 6200000.0);
}

#[test]
fn delete_is_a_tombstone() {
    let (mut projection, ids) = seeded();

    projection
        .apply(&envelope(
            5,
            AccessAddressDeleted {
                id: ids.access,
                external_updated_date: None,
            },
        ))
        .unwrap();
    projection
        .apply(&envelope(6, PostCodeDeleted { id: ids.post }))
        .unwrap();

    let access = projection.access_address(&ids.access).unwrap();
    assert!(access.deleted);
    assert_eq!(access.updated_at, Some(t0() + Duration::minutes(5)));
    assert!(projection.post_code(&ids.post).unwrap().deleted);

    // The unit address still resolves its parent through the map.
    let unit = projection.unit_address(&ids.unit).unwrap();
    let parent = projection.access_address(&unit.access_address_id).unwrap();
    assert_eq!(parent.external_id.as_deref(), Some("AA-1"));
}

#[test]
fn delete_can_leave_updated_at_alone() {
    let ids = (PostCodeId::new(), RoadId::new(), AccessAddressId::new());
    let mut projection = AddressProjection::new(ProjectionOptions {
        touch_updated_at_on_delete: false,
        ..ProjectionOptions::default()
    });
    projection.apply(&envelope(1, post_code_created(ids.0))).unwrap();
    projection.apply(&envelope(2, road_created(ids.1))).unwrap();
    projection
        .apply(&envelope(3, access_address_created(ids.2, ids.1, ids.0)))
        .unwrap();
    projection
        .apply(&envelope(
            4,
            AccessAddressDeleted {
                id: ids.2,
                external_updated_date: None,
            },
        ))
        .unwrap();

    let access = projection.access_address(&ids.2).unwrap();
    assert!(access.deleted);
    assert_eq!(access.updated_at, None);
}

#[test]
fn external_attribute_timestamps_when_configured() {
    let registry_created = Utc.with_ymd_and_hms(2019, 3, 1, 8, 0, 0).unwrap();
    let registry_changed = Utc.with_ymd_and_hms(2020, 7, 9, 10, 30, 0).unwrap();
    let (post, road, access) = (PostCodeId::new(), RoadId::new(), AccessAddressId::new());

    let mut projection = AddressProjection::new(ProjectionOptions {
        timestamp_source: TimestampSource::ExternalAttribute,
        ..ProjectionOptions::default()
    });
    projection.apply(&envelope(1, post_code_created(post))).unwrap();
    projection.apply(&envelope(2, road_created(road))).unwrap();

    let AccessAddressEvent::Created(mut created) = access_address_created(access, road, post) else {
        unreachable!()
    };
    created.external_created_date = Some(registry_created);
    projection.apply(&envelope(3, created)).unwrap();

    projection
        .apply(&envelope(
            4,
            AccessAddressTownNameChanged {
                id: access,
                town_name: Some("Lystrup".to_string()),
                external_updated_date: Some(registry_changed),
            },
        ))
        .unwrap();

    let record = projection.access_address(&access).unwrap();
    assert_eq!(record.created_at, registry_created);
    assert_eq!(record.updated_at, Some(registry_changed));

    // No attribute on the event: falls back to the commit time.
    projection
        .apply(&envelope(
            5,
            AccessAddressPlotIdChanged {
                id: access,
                plot_id: Some("7a".to_string()),
                external_updated_date: None,
            },
        ))
        .unwrap();
    let record = projection.access_address(&access).unwrap();
    assert_eq!(record.updated_at, Some(t0() + Duration::minutes(5)));
}

#[test]
fn wholesale_update_replaces_fields_but_not_creation() {
    let (mut projection, ids) = seeded();
    let other_road = RoadId::new();

    projection
        .apply(&envelope(
            5,
            RoadUpdated {
                id: ids.road,
                external_id: "R-9".to_string(),
                name: "High St".to_string(),
            },
        ))
        .unwrap();
    projection
        .apply(&envelope(
            6,
            AccessAddressUpdated {
                id: ids.access,
                external_id: None,
                municipal_code: "0101".to_string(),
                status: AddressStatus::Pending,
                road_code: "0001".to_string(),
                house_number: "3".to_string(),
                east_coordinate: 10.0,
                north_coordinate: 20.0,
                town_name: Some("Risskov".to_string()),
                plot_id: None,
                road_id: other_road,
                post_code_id: ids.post,
                external_updated_date: None,
            },
        ))
        .unwrap();

    let road = projection.road(&ids.road).unwrap();
    assert_eq!((road.external_id.as_str(), road.name.as_str()), ("R-9", "High St"));

    let access = projection.access_address(&ids.access).unwrap();
    assert_eq!(access.created_at, t0() + Duration::minutes(3));
    assert_eq!(access.updated_at, Some(t0() + Duration::minutes(6)));
    assert_eq!(access.road_id, other_road);
    assert_eq!(access.external_id, None);
    assert_eq!(access.status, AddressStatus::Pending);
}

#[test]
fn unit_address_changes_are_field_by_field() {
    let (mut projection, ids) = seeded();

    projection
        .apply(&envelope(
            5,
            UnitAddressFloorNameChanged {
                id: ids.unit,
                floor_name: None,
                external_updated_date: None,
            },
        ))
        .unwrap();
    projection
        .apply(&envelope(
            6,
            UnitAddressSuiteNameChanged {
                id: ids.unit,
                suite_name: Some("th".to_string()),
                external_updated_date: None,
            },
        ))
        .unwrap();

    let unit = projection.unit_address(&ids.unit).unwrap();
    assert_eq!(unit.floor_name, None);
    assert_eq!(unit.suite_name.as_deref(), Some("th"));
    assert_eq!(unit.updated_at, Some(t0() + Duration::minutes(6)));
    assert_eq!(projection.applied_events(), 6);
}

/// Operations the generator can pick; turned into a causally valid event
/// stream by [`to_events`].
#[derive(Debug, Clone)]
enum Op {
    Road(u8),
    Access(u8, u8, f64, f64),
    Unit(u8, u8),
    RenameRoad(u8, String),
    MoveAccess(u8, f64, f64),
    SetFloor(u8, Option<String>),
    DeleteAccess(u8),
    DeleteUnit(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let slot = 0u8..4;
    let coord = -1.0e6f64..1.0e7f64;
    prop_oneof![
        slot.clone().prop_map(Op::Road),
        (slot.clone(), slot.clone(), coord.clone(), coord.clone())
            .prop_map(|(a, r, e, n)| Op::Access(a, r, e, n)),
        (slot.clone(), slot.clone()).prop_map(|(u, a)| Op::Unit(u, a)),
        (slot.clone(), "[a-z]{1,8}").prop_map(|(r, n)| Op::RenameRoad(r, n)),
        (slot.clone(), coord.clone(), coord).prop_map(|(a, e, n)| Op::MoveAccess(a, e, n)),
        (slot.clone(), proptest::option::of("[0-9]{1,2}")).prop_map(|(u, f)| Op::SetFloor(u, f)),
        slot.clone().prop_map(Op::DeleteAccess),
        slot.prop_map(Op::DeleteUnit),
    ]
}

/// Map slot numbers to fixed ids and skip any op that would break causal order,
/// so the resulting stream is always valid.
fn to_events(ops: &[Op]) -> Vec<EventEnvelope<AddressEvent>> {
    let uuid = |family: u8, slot: u8| Uuid::from_u128(((family as u128) << 8) | slot as u128);
    let post = PostCodeId::from_uuid(uuid(0, 0));
    let road = |s| RoadId::from_uuid(uuid(1, s));
    let access = |s| AccessAddressId::from_uuid(uuid(2, s));
    let unit = |s| UnitAddressId::from_uuid(uuid(3, s));

    let mut roads = [false; 4];
    let mut accesses = [false; 4];
    let mut units = [false; 4];
    let mut events: Vec<AddressEvent> = vec![post_code_created(post).into()];

    for op in ops {
        let event: Option<AddressEvent> = match op.clone() {
            Op::Road(r) if !roads[r as usize] => {
                roads[r as usize] = true;
                Some(road_created(road(r)).into())
            }
            Op::Access(a, r, e, n) if !accesses[a as usize] && roads[r as usize] => {
                accesses[a as usize] = true;
                let AccessAddressEvent::Created(mut c) = access_address_created(access(a), road(r), post)
                else {
                    unreachable!()
                };
                c.east_coordinate = e;
                c.north_coordinate = n;
                Some(c.into())
            }
            Op::Unit(u, a) if !units[u as usize] && accesses[a as usize] => {
                units[u as usize] = true;
                Some(unit_address_created(unit(u), access(a)).into())
            }
            Op::RenameRoad(r, name) if roads[r as usize] => {
                Some(RoadEvent::from(RoadNameChanged { id: road(r), name }).into())
            }
            Op::MoveAccess(a, e, n) if accesses[a as usize] => Some(
                AccessAddressEvent::from(AccessAddressCoordinateChanged {
                    id: access(a),
                    east_coordinate: e,
                    north_coordinate: n,
                    external_updated_date: None,
                })
                .into(),
            ),
            Op::SetFloor(u, floor) if units[u as usize] => Some(
                UnitAddressEvent::from(UnitAddressFloorNameChanged {
                    id: unit(u),
                    floor_name: floor,
                    external_updated_date: None,
                })
                .into(),
            ),
            Op::DeleteAccess(a) if accesses[a as usize] => Some(
                AccessAddressEvent::from(AccessAddressDeleted {
                    id: access(a),
                    external_updated_date: None,
                })
                .into(),
            ),
            Op::DeleteUnit(u) if units[u as usize] => Some(
                UnitAddressEvent::from(UnitAddressDeleted {
                    id: unit(u),
                    external_updated_date: None,
                })
                .into(),
            ),
            _ => None,
        };
        events.extend(event);
    }

    events
        .into_iter()
        .enumerate()
        .map(|(i, event)| {
            let position = i as u64 + 1;
            EventEnvelope::new(
                Uuid::from_u128(position as u128),
                Uuid::nil(),
                position,
                event.event_type(),
                t0() + Duration::seconds(position as i64),
                event,
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// Property: folding the same ordered history twice gives identical maps.
    #[test]
    fn replay_is_deterministic(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let events = to_events(&ops);

        let (first, first_cursor) = rebuild_from_scratch(AddressProjection::default, &events).unwrap();
        let (second, _) = rebuild_from_scratch(AddressProjection::default, &events).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.applied_events(), events.len() as u64);
        prop_assert_eq!(first_cursor.applied(), events.len() as u64);

        // Every unit address still resolves its parent, deleted or not.
        for unit in first.unit_addresses().values() {
            prop_assert!(first.access_address(&unit.access_address_id).is_some());
        }
    }
}
