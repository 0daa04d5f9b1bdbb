//! Combat system - bullets, bounces, hit detection and scoring

use rand::Rng;

use crate::config::ArenaConfig;

use super::collision::{ArenaGeometry, Reflection};
use super::session::{PlayerId, SessionRegistry};

/// Bullet tuning shared by every shooter
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Displacement per tick
    pub bullet_speed: f32,
    /// Bounces survived before the bullet is retired
    pub max_bounces: u32,
    /// Integration sub-steps per tick
    pub substeps: u32,
    /// Distance under which a bullet hits a player
    pub hit_radius: f32,
}

impl WeaponStats {
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self {
            bullet_speed: config.bullet_speed,
            max_bounces: config.max_bounces,
            substeps: config.substeps.max(1),
            hit_radius: config.hit_radius,
        }
    }
}

/// What stopped a bullet's sub-stepping this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bounce {
    Boundary(Reflection),
    Obstacle(Reflection),
}

/// Live bullet in the arena
#[derive(Debug, Clone)]
pub struct Bullet {
    pub owner_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub bounces: u32,
    pub max_bounces: u32,
    /// Set on a confirmed hit; the bullet is dropped at the end of the tick
    pub dead: bool,
}

impl Bullet {
    /// Create a bullet travelling along `angle` from `(x, y)`
    pub fn new(owner_id: PlayerId, x: f32, y: f32, angle: f32, stats: &WeaponStats) -> Self {
        Self {
            owner_id,
            x,
            y,
            vel_x: angle.cos() * stats.bullet_speed,
            vel_y: angle.sin() * stats.bullet_speed,
            bounces: 0,
            max_bounces: stats.max_bounces,
            dead: false,
        }
    }

    fn reflect(&mut self, reflection: Reflection) {
        match reflection {
            Reflection::X => self.vel_x = -self.vel_x,
            Reflection::Y => self.vel_y = -self.vel_y,
            Reflection::Both => {
                self.vel_x = -self.vel_x;
                self.vel_y = -self.vel_y;
            }
        }
    }

    /// Advance one tick in `substeps` equal steps.
    ///
    /// Stops at the first wall or obstacle contact. Obstacle contacts roll the
    /// bullet back to its pre-step point, which is known to be outside the
    /// obstacle. Boundary contacts leave the bullet where it landed; the flipped
    /// velocity carries it back inside on the next tick.
    pub fn advance(&mut self, geometry: &ArenaGeometry<'_>, substeps: u32) -> Option<Bounce> {
        let substeps = substeps.max(1);
        let step_x = self.vel_x / substeps as f32;
        let step_y = self.vel_y / substeps as f32;

        for _ in 0..substeps {
            let prev_x = self.x;
            let prev_y = self.y;
            self.x += step_x;
            self.y += step_y;

            if let Some(reflection) = geometry.boundary_reflection(self.x, self.y) {
                self.reflect(reflection);
                self.bounces += 1;
                return Some(Bounce::Boundary(reflection));
            }

            if let Some(obstacle) = geometry.obstacle_at(self.x, self.y) {
                let reflection = obstacle.struck_face(prev_x, prev_y);
                self.reflect(reflection);
                self.x = prev_x;
                self.y = prev_y;
                self.bounces += 1;
                return Some(Bounce::Obstacle(reflection));
            }
        }

        None
    }

    /// Dead or out of bounces
    pub fn is_retired(&self) -> bool {
        self.dead || self.bounces > self.max_bounces
    }

    /// Check collision with a target point
    pub fn check_hit(&self, target_x: f32, target_y: f32, hit_radius: f32) -> bool {
        let dx = self.x - target_x;
        let dy = self.y - target_y;
        (dx * dx + dy * dy).sqrt() < hit_radius
    }
}

/// Hit result from combat resolution
#[derive(Debug, Clone)]
pub struct HitResult {
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
    pub x: f32,
    pub y: f32,
}

/// Combat system for spawning and simulating bullets
pub struct CombatSystem;

impl CombatSystem {
    /// Fire from an active player's current position.
    /// Returns None for unknown or inactive shooters.
    pub fn fire(
        registry: &SessionRegistry,
        shooter_id: PlayerId,
        angle: f32,
        stats: &WeaponStats,
    ) -> Option<Bullet> {
        let shooter = registry.active(&shooter_id)?;
        Some(Bullet::new(shooter.id, shooter.x, shooter.y, angle, stats))
    }

    /// Advance every bullet one tick, score hits, and drop retired bullets.
    ///
    /// Victims are drawn from the active players at the start of the call. A
    /// bullet scores on the first victim it is found near and is then dead.
    pub fn step<R: Rng>(
        bullets: &mut Vec<Bullet>,
        registry: &mut SessionRegistry,
        geometry: &ArenaGeometry<'_>,
        stats: &WeaponStats,
        rng: &mut R,
    ) -> Vec<HitResult> {
        let targets = registry.active_ids();
        let mut hits = Vec::new();

        for bullet in bullets.iter_mut() {
            if bullet.dead {
                continue;
            }

            bullet.advance(geometry, stats.substeps);

            let victim = targets.iter().copied().find(|id| {
                *id != bullet.owner_id
                    && registry
                        .active(id)
                        .is_some_and(|p| bullet.check_hit(p.x, p.y, stats.hit_radius))
            });

            if let Some(target_id) = victim {
                bullet.dead = true;

                if let Some(shooter) = registry.get_mut(&bullet.owner_id) {
                    shooter.kills += 1;
                }
                if let Some(target) = registry.get_mut(&target_id) {
                    target.deaths += 1;
                }
                registry.respawn(target_id, rng);

                hits.push(HitResult {
                    shooter_id: bullet.owner_id,
                    target_id,
                    x: bullet.x,
                    y: bullet.y,
                });
            }
        }

        bullets.retain(|b| !b.is_retired());
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collision::Rect;
    use crate::game::session::SpawnArea;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    const WALL: Rect = Rect::new(100.0, 100.0, 200.0, 20.0);

    fn stats() -> WeaponStats {
        WeaponStats::from_config(&ArenaConfig::default())
    }

    fn bullet(x: f32, y: f32, vel_x: f32, vel_y: f32) -> Bullet {
        Bullet {
            owner_id: Uuid::new_v4(),
            x,
            y,
            vel_x,
            vel_y,
            bounces: 0,
            max_bounces: 3,
            dead: false,
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(SpawnArea::new(800.0, 50.0), 12)
    }

    fn place(registry: &mut SessionRegistry, rng: &mut ChaCha8Rng, x: f32, y: f32) -> PlayerId {
        let id = registry.connect(rng);
        registry.join(id, "p", rng);
        let player = registry.get_mut(&id).unwrap();
        player.x = x;
        player.y = y;
        id
    }

    #[test]
    fn new_bullet_travels_along_angle() {
        let b = Bullet::new(Uuid::new_v4(), 10.0, 20.0, 0.0, &stats());
        assert_eq!((b.vel_x, b.vel_y), (10.0, 0.0));
        assert_eq!((b.bounces, b.max_bounces, b.dead), (0, 3, false));
    }

    #[test]
    fn top_face_hit_reflects_y_and_rolls_back() {
        let obstacles = [WALL];
        let geometry = ArenaGeometry::new(800.0, &obstacles);
        let mut b = bullet(200.0, 95.0, 0.0, 10.0);

        let bounce = b.advance(&geometry, 5);

        assert_eq!(bounce, Some(Bounce::Obstacle(Reflection::Y)));
        assert_eq!((b.x, b.y), (200.0, 99.0));
        assert_eq!((b.vel_x, b.vel_y), (0.0, -10.0));
        assert_eq!(b.bounces, 1);
    }

    #[test]
    fn side_face_hit_reflects_x() {
        let obstacles = [WALL];
        let geometry = ArenaGeometry::new(800.0, &obstacles);
        let mut b = bullet(95.0, 110.0, 10.0, 0.0);

        let bounce = b.advance(&geometry, 5);

        assert_eq!(bounce, Some(Bounce::Obstacle(Reflection::X)));
        assert_eq!((b.x, b.y), (99.0, 110.0));
        assert_eq!((b.vel_x, b.vel_y), (-10.0, 0.0));
    }

    #[test]
    fn corner_hit_reflects_both() {
        let obstacles = [WALL];
        let geometry = ArenaGeometry::new(800.0, &obstacles);
        let mut b = bullet(95.0, 95.0, 10.0, 10.0);

        let bounce = b.advance(&geometry, 5);

        assert_eq!(bounce, Some(Bounce::Obstacle(Reflection::Both)));
        assert_eq!((b.vel_x, b.vel_y), (-10.0, -10.0));
        assert!(!WALL.contains(b.x, b.y));
    }

    #[test]
    fn substeps_prevent_tunneling_through_thin_wall() {
        // One 40-unit jump from x=385 would land at 425, clear of the 20-unit pillar.
        let obstacles = [Rect::new(400.0, 100.0, 20.0, 200.0)];
        let geometry = ArenaGeometry::new(800.0, &obstacles);
        let mut b = bullet(385.0, 150.0, 40.0, 0.0);

        let bounce = b.advance(&geometry, 5);

        assert_eq!(bounce, Some(Bounce::Obstacle(Reflection::X)));
        assert!(b.x < 400.0);
        assert!(b.vel_x < 0.0);
    }

    #[test]
    fn top_wall_reflects_y_only() {
        let geometry = ArenaGeometry::new(800.0, &[]);
        let mut b = bullet(400.0, 5.0, 0.0, -10.0);

        let bounce = b.advance(&geometry, 5);

        assert_eq!(bounce, Some(Bounce::Boundary(Reflection::Y)));
        assert_eq!(b.vel_y, 10.0);
        assert_eq!(b.vel_x, 0.0);
        assert_eq!(b.bounces, 1);
    }

    #[test]
    fn wall_bounce_stops_substepping() {
        let geometry = ArenaGeometry::new(800.0, &[]);
        let mut b = bullet(796.0, 400.0, 10.0, 0.0);

        b.advance(&geometry, 5);

        // 798 then 800: bounce, remaining three sub-steps skipped.
        assert_eq!(b.x, 800.0);
        assert_eq!(b.vel_x, -10.0);
    }

    #[test]
    fn straight_shot_bounces_off_far_wall_and_returns() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut registry = registry();
        let geometry = ArenaGeometry::new(800.0, &[]);
        let mut bullets = vec![Bullet::new(Uuid::new_v4(), 400.0, 400.0, 0.0, &stats())];

        for _ in 0..40 {
            CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);
        }
        assert_eq!(bullets[0].x, 800.0);
        assert_eq!(bullets[0].bounces, 1);
        assert!(bullets[0].vel_x < 0.0);

        for _ in 0..40 {
            CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);
        }
        assert_eq!(bullets[0].x, 400.0);
        assert_eq!(bullets[0].y, 400.0);
        assert_eq!(bullets[0].bounces, 1);
    }

    #[test]
    fn bullet_retired_after_exceeding_max_bounces() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut registry = registry();
        let geometry = ArenaGeometry::new(800.0, &[]);
        let mut b = bullet(796.0, 400.0, 10.0, 0.0);
        b.bounces = 2;
        let mut bullets = vec![b];

        CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].bounces, 3);

        // Travel back across the arena to the left wall.
        for _ in 0..80 {
            CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);
        }
        assert!(bullets.is_empty());
    }

    #[test]
    fn hit_scores_and_respawns_victim() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut registry = registry();
        let shooter = place(&mut registry, &mut rng, 400.0, 400.0);
        let victim = place(&mut registry, &mut rng, 415.0, 400.0);
        let geometry = ArenaGeometry::new(800.0, &[]);

        let mut bullets = vec![CombatSystem::fire(&registry, shooter, 0.0, &stats()).unwrap()];
        let hits = CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].shooter_id, shooter);
        assert_eq!(hits[0].target_id, victim);
        assert_eq!(registry.get(&shooter).unwrap().kills, 1);
        let victim = registry.get(&victim).unwrap();
        assert_eq!(victim.deaths, 1);
        assert!(SpawnArea::new(800.0, 50.0).contains(victim.x, victim.y));
        assert!(bullets.is_empty());
    }

    #[test]
    fn bullet_never_hits_its_owner() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut registry = registry();
        let shooter = place(&mut registry, &mut rng, 400.0, 400.0);
        let geometry = ArenaGeometry::new(800.0, &[]);

        // Out to the wall and back through the owner's own position.
        let mut bullets = vec![CombatSystem::fire(&registry, shooter, 0.0, &stats()).unwrap()];
        for _ in 0..200 {
            let hits =
                CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);
            assert!(hits.is_empty());
        }
        assert_eq!(registry.get(&shooter).unwrap().deaths, 0);
    }

    #[test]
    fn one_bullet_hits_one_victim() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut registry = registry();
        let shooter = place(&mut registry, &mut rng, 400.0, 400.0);
        let a = place(&mut registry, &mut rng, 410.0, 395.0);
        let b = place(&mut registry, &mut rng, 410.0, 405.0);
        let geometry = ArenaGeometry::new(800.0, &[]);

        let mut bullets = vec![CombatSystem::fire(&registry, shooter, 0.0, &stats()).unwrap()];
        let hits = CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);

        assert_eq!(hits.len(), 1);
        let deaths = registry.get(&a).unwrap().deaths + registry.get(&b).unwrap().deaths;
        assert_eq!(deaths, 1);
        assert_eq!(registry.get(&shooter).unwrap().kills, 1);
        assert!(bullets.is_empty());
    }

    #[test]
    fn inactive_players_are_not_targets() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut registry = registry();
        let shooter = place(&mut registry, &mut rng, 400.0, 400.0);
        let spectator = registry.connect(&mut rng);
        {
            let p = registry.get_mut(&spectator).unwrap();
            p.x = 410.0;
            p.y = 400.0;
        }
        let geometry = ArenaGeometry::new(800.0, &[]);

        let mut bullets = vec![CombatSystem::fire(&registry, shooter, 0.0, &stats()).unwrap()];
        let hits = CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);

        assert!(hits.is_empty());
        assert_eq!(bullets.len(), 1);
    }

    #[test]
    fn inactive_or_unknown_shooter_cannot_fire() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut registry = registry();
        let spectator = registry.connect(&mut rng);

        assert!(CombatSystem::fire(&registry, spectator, 0.0, &stats()).is_none());
        assert!(CombatSystem::fire(&registry, Uuid::new_v4(), 0.0, &stats()).is_none());
    }

    #[test]
    fn orphaned_bullet_still_hits() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut registry = registry();
        let shooter = place(&mut registry, &mut rng, 400.0, 400.0);
        let victim = place(&mut registry, &mut rng, 415.0, 400.0);
        let geometry = ArenaGeometry::new(800.0, &[]);

        let mut bullets = vec![CombatSystem::fire(&registry, shooter, 0.0, &stats()).unwrap()];
        registry.disconnect(shooter);
        let hits = CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats(), &mut rng);

        assert_eq!(hits.len(), 1);
        assert_eq!(registry.get(&victim).unwrap().deaths, 1);
        assert!(bullets.is_empty());
    }

    #[test]
    fn surviving_bullets_stay_within_bounce_limit() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut registry = registry();
        let obstacles = ArenaConfig::default().obstacles;
        let geometry = ArenaGeometry::new(800.0, &obstacles);
        let stats = stats();

        let mut bullets: Vec<Bullet> = (0..64)
            .map(|_| {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                Bullet::new(Uuid::new_v4(), 60.0, 60.0, angle, &stats)
            })
            .collect();

        for _ in 0..600 {
            CombatSystem::step(&mut bullets, &mut registry, &geometry, &stats, &mut rng);
            for b in &bullets {
                assert!(b.bounces <= b.max_bounces);
                assert!(!b.dead);
                assert!(obstacles.iter().all(|o| !o.contains(b.x, b.y)));
            }
        }
    }
}
