//! End-to-end frame loop scenarios: systems spawning, moving and expiring
//! entities across frames.

use std::cell::Cell;
use std::rc::Rc;

use yerb_engine::prelude::*;

fn movement(manager: &EntityManager, _ctx: &FrameContext) {
    for transform in manager.components().dense::<Transform>() {
        let mut t = transform.borrow_mut();
        let velocity = t.velocity;
        t.position += velocity;
    }
}

fn expire_lifespans(manager: &EntityManager, _ctx: &FrameContext) {
    for entity in manager.entities() {
        let expired = entity
            .get_component::<Lifespan>()
            .is_some_and(|life| life.borrow_mut().tick(1));
        if expired {
            entity.destroy();
        }
    }
}

#[test]
fn update_runs_once_per_frame() {
    let mut frames = FrameLoop::new(FrameConfig::default()).unwrap();
    frames
        .add_system("spawner", |manager, _| {
            manager.add_entity(EntityTag::Bullet);
        })
        .unwrap();

    for expected in 1..=5 {
        let report = frames.frame();
        assert_eq!(report.committed, 1);
        assert_eq!(report.live, expected);
    }
    assert_eq!(frames.manager().last_report().live, 5);
}

#[test]
fn shooter_scenario() {
    let mut frames = FrameLoop::new(FrameConfig::default()).unwrap();

    let player = frames.manager().add_entity(EntityTag::Player);
    player.set_component(Transform::new(Vec2::new(0.0, 0.0), Vec2::ZERO));
    player.set_component(Shape::new(10.0, 10.0));

    let fired = Rc::new(Cell::new(0u32));
    let shots = Rc::clone(&fired);
    frames
        .add_system("gun", move |manager, ctx| {
            if ctx.frame % 2 == 0 {
                let bullet = manager.add_entity(EntityTag::Bullet);
                bullet.set_component(Transform::new(Vec2::new(5.0, 5.0), Vec2::new(0.0, -2.0)));
                bullet.set_component(Shape::new(2.0, 2.0));
                bullet.set_component(Lifespan::new(3));
                shots.set(shots.get() + 1);
            }
        })
        .unwrap();
    frames.add_system("movement", movement).unwrap();
    frames.add_system("lifespan", expire_lifespans).unwrap();

    frames.run_frames(10);

    // Bullets fired on frames 0..8; each lives three frames after commit.
    assert_eq!(fired.get(), 5);
    let bullets = frames.manager().entities_by_tag(EntityTag::Bullet);
    assert!(bullets.len() <= 2);
    assert!(bullets.iter().all(|b| b.is_active()));
    assert_eq!(frames.manager().entities_by_tag(EntityTag::Player).len(), 1);

    // Every purged bullet's components are gone from the registry.
    let registry = frames.manager().components();
    assert_eq!(registry.dense::<Lifespan>().len(), bullets.len());
    assert_eq!(registry.dense::<Transform>().len(), bullets.len() + 1);
}

#[test]
fn system_spawning_inside_dense_pass_lands_at_update() {
    let mut frames = FrameLoop::new(FrameConfig::default()).unwrap();
    for x in [0.0, 50.0] {
        let enemy = frames.manager().add_entity(EntityTag::Enemy);
        enemy.set_component(Transform::new(Vec2::new(x, 0.0), Vec2::ZERO));
    }
    frames.frame();

    frames
        .add_system("drops", |manager, ctx| {
            if ctx.frame != 1 {
                return;
            }
            for transform in manager.components().dense::<Transform>() {
                let loot = manager.add_entity(EntityTag::Item);
                loot.set_component(Transform::new(transform.borrow().position, Vec2::ZERO));
                loot.set_component(Lifespan::new(3));
            }
        })
        .unwrap();

    let report = frames.frame();
    assert_eq!(report.deferred_writes, 4);
    assert_eq!(report.committed, 2);
    let items = frames.manager().entities_by_tag(EntityTag::Item);
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.has_component::<Lifespan>()));
    assert_eq!(frames.manager().pending_writes(), 0);
}

#[test]
fn radius_query_inside_a_system() {
    let mut frames = FrameLoop::new(FrameConfig::default()).unwrap();
    let bomb = frames.manager().add_entity(EntityTag::Item);
    bomb.set_component(Transform::new(Vec2::ZERO, Vec2::ZERO));
    bomb.set_component(Shape::new(0.0, 0.0));
    for x in [3.0, 8.0, 20.0] {
        let enemy = frames.manager().add_entity(EntityTag::Enemy);
        enemy.set_component(Transform::new(Vec2::new(x, 0.0), Vec2::ZERO));
        enemy.set_component(Shape::new(0.0, 0.0));
    }
    frames.frame();

    frames
        .add_system("explosion", |manager, _| {
            for bomb in manager.entities_by_tag(EntityTag::Item) {
                let hit = entities_in_radius(bomb, manager.entities_by_tag(EntityTag::Enemy), 10.0);
                for enemy in &hit {
                    enemy.destroy();
                }
                bomb.destroy();
            }
        })
        .unwrap();

    let report = frames.frame();
    assert_eq!(report.purged, 3);
    let survivors = frames.manager().entities_by_tag(EntityTag::Enemy);
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].center_pos(), Some(Vec2::new(20.0, 0.0)));
}

#[test]
fn config_deserializes_with_defaults() {
    let config: FrameConfig = serde_json::from_str(r#"{ "entity_capacity": 256 }"#).unwrap();
    assert_eq!(config.entity_capacity, 256);
    assert_eq!(config.fixed_dt, FrameConfig::default().fixed_dt);

    let config: FrameConfig = serde_json::from_str(r#"{ "fixed_dt": 0.02 }"#).unwrap();
    assert_eq!(config.fixed_dt, 0.02);
    assert!(FrameLoop::new(config).is_ok());
}

#[test]
fn deserialized_zero_timestep_rejected() {
    let config: FrameConfig = serde_json::from_str(r#"{ "fixed_dt": 0.0 }"#).unwrap();
    let err = FrameLoop::new(config).unwrap_err();
    assert!(err.to_string().contains("fixed_dt"));
}

#[test]
fn manager_mut_allows_setup_between_frames() {
    let mut frames = FrameLoop::new(FrameConfig::default()).unwrap();
    frames.manager_mut().add_entity(EntityTag::Wall);
    frames.manager_mut().update();
    assert_eq!(frames.manager().len(), 1);
    assert_eq!(frames.frame_count(), 0);
}
