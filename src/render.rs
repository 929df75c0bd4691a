use std::collections::HashSet;

use crate::config::GameSettings;
use crate::engine::GameEngine;
use crate::types::{Direction, Vec2};

/// Text rendering of the field, one line per row, wrapped in a wall border.
pub fn render_field(engine: &GameEngine, settings: &GameSettings) -> String {
    let glyphs = &settings.glyphs;
    let width = engine.field.width.max(0) as usize;
    let zombies: HashSet<Vec2> = engine.zombies().iter().copied().collect();
    let portal_active = engine.portal_active();

    let border = glyphs.wall.repeat(width + 2);
    let mut rows = Vec::with_capacity(engine.field.height.max(0) as usize + 2);
    rows.push(border.clone());
    for y in 0..engine.field.height {
        let mut row = String::new();
        row.push_str(&glyphs.wall);
        for x in 0..engine.field.width {
            row.push_str(cell_glyph(engine, settings, &zombies, portal_active, Vec2::new(x, y)));
        }
        row.push_str(&glyphs.wall);
        rows.push(row);
    }
    rows.push(border);
    rows.join("\n")
}

fn cell_glyph<'a>(
    engine: &GameEngine,
    settings: &'a GameSettings,
    zombies: &HashSet<Vec2>,
    portal_active: bool,
    cell: Vec2,
) -> &'a str {
    let glyphs = &settings.glyphs;
    if let Some(player_id) = engine.player_at(cell) {
        return engine
            .player_identity(player_id)
            .map(|slot| glyphs.identity(slot))
            .unwrap_or(glyphs.player.as_str());
    }
    if engine.field.portal == Some(cell) {
        return if portal_active {
            glyphs.portal.as_str()
        } else {
            glyphs.empty.as_str()
        };
    }
    if zombies.contains(&cell) {
        return glyphs.zombie.as_str();
    }
    if let Some(kind) = engine.field.items.get(&cell) {
        return settings.item_glyphs.glyph(*kind);
    }
    if engine.field.is_obstacle(cell) {
        return glyphs.obstacle.as_str();
    }
    glyphs.empty.as_str()
}

pub fn render_lives(lives: u32, settings: &GameSettings) -> String {
    if lives == 0 {
        return settings.glyphs.skull.clone();
    }
    settings.glyphs.heart.repeat(lives as usize)
}

/// Maps a movement control glyph back to its direction.
pub fn direction_for_glyph(glyph: &str, settings: &GameSettings) -> Option<Direction> {
    let glyph = glyph.trim();
    Direction::ALL
        .into_iter()
        .find(|dir| settings.glyphs.direction(*dir) == glyph)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::config::EngineOptions;
    use crate::rng::Rng;
    use crate::types::ItemKind;
    use crate::world::GeneratedField;

    fn tiny_engine() -> GameEngine {
        let mut engine = GameEngine::new(
            1,
            Vec::new(),
            GameSettings::default(),
            EngineOptions::default(),
            Rng::new(3),
        );
        let mut items = BTreeMap::new();
        items.insert(Vec2::new(1, 0), ItemKind::Coal);
        engine.field = GeneratedField {
            width: 3,
            height: 2,
            required_items: 5,
            obstacles: BTreeSet::from([Vec2::new(2, 1)]),
            items,
            portal: Some(Vec2::new(0, 1)),
        };
        engine.replace_zombies(Vec::new());
        engine.add_player("a", 3).expect("free cell");
        engine
    }

    #[test]
    fn renders_walls_and_cell_priorities() {
        let settings = GameSettings::default();
        let engine = tiny_engine();
        let text = render_field(&engine, &settings);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "⬛".repeat(5));
        assert_eq!(lines[3], "⬛".repeat(5));
        for line in &lines[1..3] {
            assert!(line.starts_with('⬛'));
            assert!(line.ends_with('⬛'));
        }

        let position = engine.player_position("a").expect("player seated");
        let mut expected = vec![vec!["🟦"; 3]; 2];
        expected[0][1] = "⚫";
        expected[1][2] = "🟥";
        // Inactive portal renders as an empty cell.
        expected[1][0] = "🟦";
        expected[position.y as usize][position.x as usize] = "🟢";
        for (y, row) in expected.iter().enumerate() {
            assert_eq!(lines[y + 1], format!("⬛{}⬛", row.concat()));
        }
    }

    #[test]
    fn player_glyph_wins_over_zombie_and_item() {
        let settings = GameSettings::default();
        let engine = tiny_engine();
        let position = engine.player_position("a").expect("player seated");
        let zombies = HashSet::from([position, Vec2::new(1, 0)]);
        assert_eq!(cell_glyph(&engine, &settings, &zombies, false, position), "🟢");
        assert_eq!(
            cell_glyph(&engine, &settings, &zombies, false, Vec2::new(1, 0)),
            "🧟"
        );
        assert_eq!(
            cell_glyph(&engine, &settings, &zombies, true, Vec2::new(0, 1)),
            "🛠️"
        );
    }

    #[test]
    fn lives_render_as_hearts_or_skull() {
        let settings = GameSettings::default();
        assert_eq!(render_lives(3, &settings), "❤️❤️❤️");
        assert_eq!(render_lives(0, &settings), "💀");
    }

    #[test]
    fn direction_glyphs_map_back() {
        let mut settings = GameSettings::default();
        assert_eq!(direction_for_glyph("⬆️", &settings), Some(Direction::Up));
        assert_eq!(direction_for_glyph("➡️", &settings), Some(Direction::Right));
        assert_eq!(direction_for_glyph("✅", &settings), None);
        settings.glyphs.left = "<".to_string();
        assert_eq!(direction_for_glyph("<", &settings), Some(Direction::Left));
        assert_eq!(direction_for_glyph("⬅️", &settings), None);
    }
}
