//! Collision detection and response
//!
//! Everything here is circle vs circle. [`resolve_elastic`] is the generic
//! two-body bounce; [`resolve_collisions`] runs every pairing the game cares
//! about and turns lethal hits into destruction, fragments and pickups.

use glam::Vec2;
use rand::Rng;

use super::asteroid::fragment;
use super::body::KineticBody;
use super::state::{Bonus, BonusKind, EntityId, Owner, SimEvent, WorldState};
use super::tractor::TractorPhase;
use crate::consts::*;

/// Bounce two massed bodies off each other
///
/// Bodies moving apart, or with coincident centres (no usable normal, as
/// with a fresh fragment pair), are left alone. Otherwise an impulse with
/// [`RESTITUTION`] is split by inverse mass and the overlap is pushed out
/// the same way. Returns true when an impulse was applied.
pub fn resolve_elastic(a: &mut KineticBody, mass_a: f32, b: &mut KineticBody, mass_b: f32) -> bool {
    let delta = b.pos - a.pos;
    let dist = delta.length();
    let reach = a.radius + b.radius;
    if !dist.is_finite() || dist >= reach || dist <= f32::EPSILON {
        return false;
    }

    let normal = delta / dist;
    let relative = (b.vel - a.vel).dot(normal);
    if relative > 0.0 {
        return false;
    }

    let inv_a = inverse_mass(mass_a);
    let inv_b = inverse_mass(mass_b);
    let inv_sum = inv_a + inv_b;
    if inv_sum <= 0.0 {
        return false;
    }

    let impulse = -(1.0 + RESTITUTION) * relative / inv_sum;
    a.vel -= normal * impulse * inv_a;
    b.vel += normal * impulse * inv_b;

    let overlap = reach - dist;
    a.pos -= normal * overlap * (inv_a / inv_sum);
    b.pos += normal * overlap * (inv_b / inv_sum);
    true
}

#[inline]
fn inverse_mass(mass: f32) -> f32 {
    if mass.is_finite() && mass > 0.0 { 1.0 / mass } else { 0.0 }
}

/// Run every collision pairing for this tick
pub fn resolve_collisions(world: &mut WorldState) {
    bullet_hits(world);
    missile_hits(world);
    player_vs_asteroids(world);
    asteroid_pairs(world);
    aliens_vs_asteroids(world);
    player_vs_aliens(world);
    collect_bonuses(world);
}

/// Damage the player and emit the hit
///
/// `grace` adds a short invulnerability window so a lingering contact does
/// not drain health every tick.
fn hurt_player(world: &mut WorldState, amount: f32, grace: bool) {
    let damage = world.player.take_damage(amount);
    if damage > 0.0 {
        if grace {
            world.player.invuln_timer = world.player.invuln_timer.max(PLAYER_HIT_INVULN_TICKS);
        }
        world.emit(SimEvent::PlayerHit { damage });
    }
}

fn bullet_hits(world: &mut WorldState) {
    let mut asteroid_kills: Vec<(EntityId, Vec2)> = Vec::new();
    let mut alien_kills: Vec<EntityId> = Vec::new();
    let mut player_damage = Vec::new();

    {
        let WorldState { bullets, asteroids, aliens, player, .. } = world;
        let player_alive = !player.is_dead();
        bullets.retain(|bullet| match bullet.owner {
            Owner::Player => {
                if let Some(asteroid) = asteroids
                    .iter_mut()
                    .find(|a| !a.is_destroyed() && a.body.overlaps(&bullet.body))
                {
                    if asteroid.apply_damage(bullet.damage) {
                        asteroid_kills.push((asteroid.id, bullet.body.vel));
                    }
                    return false;
                }
                if let Some(ship) = aliens
                    .iter_mut()
                    .find(|s| !s.is_destroyed() && s.body.overlaps(&bullet.body))
                {
                    ship.knock();
                    if ship.apply_damage(bullet.damage) {
                        alien_kills.push(ship.id);
                    }
                    return false;
                }
                true
            }
            Owner::Alien => {
                if player_alive && player.body.overlaps(&bullet.body) {
                    player_damage.push(bullet.damage);
                    return false;
                }
                true
            }
        });
    }

    for amount in player_damage {
        hurt_player(world, amount, false);
    }
    for (id, impact) in asteroid_kills {
        destroy_asteroid(world, id, Some(impact));
    }
    for id in alien_kills {
        destroy_alien(world, id);
    }
}

struct Blast {
    id: EntityId,
    pos: Vec2,
    owner: Owner,
    radius: f32,
    damage: f32,
}

fn missile_hits(world: &mut WorldState) {
    let player_alive = !world.player.is_dead();
    let mut blasts = Vec::new();

    for missile in world.missiles.iter_mut().filter(|m| !m.detonated) {
        let hit = match missile.owner {
            Owner::Player => {
                world
                    .asteroids
                    .iter()
                    .any(|a| !a.is_destroyed() && a.body.overlaps(&missile.body))
                    || world
                        .aliens
                        .iter()
                        .any(|s| !s.is_destroyed() && s.body.overlaps(&missile.body))
            }
            Owner::Alien => player_alive && world.player.body.overlaps(&missile.body),
        };
        if hit {
            missile.detonated = true;
            let damage = match missile.owner {
                Owner::Player => BULLET_DAMAGE * missile.damage_multiplier,
                Owner::Alien => ALIEN_MISSILE_DAMAGE * missile.damage_multiplier,
            };
            blasts.push(Blast {
                id: missile.id,
                pos: missile.body.pos,
                owner: missile.owner,
                radius: missile.explosion_radius,
                damage,
            });
        }
    }
    world.missiles.retain(|m| !m.detonated);

    for blast in blasts {
        log::debug!("Missile {} exploded at {:?}", blast.id, blast.pos);
        world.emit(SimEvent::MissileExploded { id: blast.id, pos: blast.pos });

        match blast.owner {
            Owner::Alien => {
                if world.player.body.pos.distance(blast.pos) <= blast.radius + world.player.body.radius {
                    hurt_player(world, blast.damage, true);
                }
            }
            Owner::Player => {
                let mut asteroid_kills = Vec::new();
                for asteroid in world.asteroids.iter_mut() {
                    let offset = asteroid.body.pos - blast.pos;
                    if offset.length() <= blast.radius + asteroid.body.radius
                        && asteroid.apply_damage(blast.damage)
                    {
                        asteroid_kills.push((asteroid.id, offset));
                    }
                }
                let mut alien_kills = Vec::new();
                for ship in world.aliens.iter_mut() {
                    if ship.body.pos.distance(blast.pos) <= blast.radius + ship.body.radius {
                        ship.knock();
                        if ship.apply_damage(blast.damage) {
                            alien_kills.push(ship.id);
                        }
                    }
                }
                for (id, impact) in asteroid_kills {
                    destroy_asteroid(world, id, Some(impact));
                }
                for id in alien_kills {
                    destroy_alien(world, id);
                }
            }
        }
    }
}

fn player_vs_asteroids(world: &mut WorldState) {
    if world.player.is_dead() {
        return;
    }
    let mut impacts = 0;
    {
        let WorldState { player, asteroids, .. } = world;
        for asteroid in asteroids.iter_mut() {
            if player.body.overlaps(&asteroid.body)
                && resolve_elastic(&mut player.body, PLAYER_MASS, &mut asteroid.body, asteroid.mass)
            {
                impacts += 1;
            }
        }
    }
    for _ in 0..impacts {
        hurt_player(world, ASTEROID_IMPACT_DAMAGE, true);
    }
}

fn asteroid_pairs(world: &mut WorldState) {
    // The beam pins its target; bouncing it would only jitter the hold
    let held = world.tractor.target.filter(|_| {
        matches!(
            world.tractor.phase,
            TractorPhase::Locking | TractorPhase::Attached | TractorPhase::Displaying
        )
    });

    let asteroids = &mut world.asteroids;
    for j in 1..asteroids.len() {
        let (head, tail) = asteroids.split_at_mut(j);
        let b = &mut tail[0];
        if held == Some(b.id) {
            continue;
        }
        for a in head.iter_mut().filter(|a| held != Some(a.id)) {
            if a.body.overlaps(&b.body) {
                resolve_elastic(&mut a.body, a.mass, &mut b.body, b.mass);
            }
        }
    }
}

fn aliens_vs_asteroids(world: &mut WorldState) {
    let WorldState { aliens, asteroids, .. } = world;
    for ship in aliens.iter_mut() {
        for asteroid in asteroids.iter_mut() {
            if ship.body.overlaps(&asteroid.body)
                && resolve_elastic(&mut ship.body, ALIEN_MASS, &mut asteroid.body, asteroid.mass)
            {
                ship.knock();
            }
        }
    }
}

fn player_vs_aliens(world: &mut WorldState) {
    if world.player.is_dead() {
        return;
    }
    let mut rams = 0;
    let mut kills = Vec::new();
    {
        let WorldState { player, aliens, .. } = world;
        for ship in aliens.iter_mut() {
            if !player.body.overlaps(&ship.body) {
                continue;
            }
            resolve_elastic(&mut player.body, PLAYER_MASS, &mut ship.body, ALIEN_MASS);
            ship.knock();
            rams += 1;
            if ship.apply_damage(BULLET_DAMAGE) {
                kills.push(ship.id);
            }
        }
    }
    for _ in 0..rams {
        hurt_player(world, ALIEN_RAM_DAMAGE, true);
    }
    for id in kills {
        destroy_alien(world, id);
    }
}

fn collect_bonuses(world: &mut WorldState) {
    if world.player.is_dead() {
        return;
    }
    let mut collected = Vec::new();
    {
        let WorldState { player, bonuses, .. } = world;
        bonuses.retain(|bonus| {
            if player.body.overlaps(&bonus.body) {
                player.apply_bonus(bonus);
                collected.push(bonus.kind);
                false
            } else {
                true
            }
        });
    }
    for kind in collected {
        log::debug!("Bonus collected: {:?}", kind);
        world.emit(SimEvent::BonusCollected { kind });
    }
}

/// Remove an asteroid: score, fragments, maybe a bonus, beam release
pub fn destroy_asteroid(world: &mut WorldState, id: EntityId, impact: Option<Vec2>) {
    let Some(index) = world.asteroids.iter().position(|a| a.id == id) else {
        return;
    };
    let asteroid = world.asteroids.remove(index);
    world.score += asteroid.size.score();
    world.emit(SimEvent::AsteroidDestroyed {
        id,
        size: asteroid.size,
        pos: asteroid.body.pos,
        artifact: asteroid.is_artifact(),
    });

    let fragments = fragment(&asteroid, impact, &mut world.rng, &mut world.ids);
    if !fragments.is_empty() {
        world.emit(SimEvent::AsteroidFragmented {
            parent: id,
            fragments: fragments.iter().map(|f| f.id).collect(),
        });
        world.asteroids.extend(fragments);
    }

    if world.rng.random_bool(BONUS_DROP_CHANCE) {
        let kind = BonusKind::roll(&mut world.rng);
        let bonus_id = world.next_entity_id();
        let bonus = Bonus::spawn(bonus_id, kind, asteroid.body.pos, &mut world.rng);
        world.bonuses.push(bonus);
        world.emit(SimEvent::BonusSpawned { id: bonus_id, kind });
    }

    if world.tractor.target == Some(id) {
        if let Some((from, to)) = world.tractor.release() {
            world.emit(SimEvent::TractorPhaseChanged { from, to });
        }
    }
}

pub fn destroy_alien(world: &mut WorldState, id: EntityId) {
    let Some(index) = world.aliens.iter().position(|s| s.id == id) else {
        return;
    };
    let ship = world.aliens.remove(index);
    world.score += SCORE_ALIEN;
    log::info!("Alien {} destroyed", id);
    world.emit(SimEvent::AlienDestroyed { id, pos: ship.body.pos });
}
