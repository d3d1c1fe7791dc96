//! 回合流程測試：開戰、行動選單、移動限制、行動順序與戰鬥結束

mod common;

use battle_lib::*;
use common::*;
use skills_lib::*;

fn builtin_battle() -> (Battle, Catalog) {
    let catalog = Catalog::builtin().unwrap();
    let config = BattleConfig::lineup(&["wind", "fire", "water"], &["metal", "mist"]);
    let battle = Battle::from_config(&config, &catalog).unwrap();
    (battle, catalog)
}

fn moved_events(battle: &mut Battle) -> usize {
    battle
        .drain_events()
        .iter()
        .filter(|e| matches!(e, BattleEvent::Moved { .. }))
        .count()
}

#[test]
fn test_from_config_with_builtin_catalog() {
    init_logger();
    let (battle, catalog) = builtin_battle();

    let wind = battle.board().unit(1).unwrap();
    assert_eq!(wind.name, "風行者");
    assert_eq!(wind.pos, Pos::new(2, 2));
    assert_eq!(wind.skills.len(), 2);
    assert_eq!(wind.skills[0].id, "wind_blade");
    assert_eq!((wind.hp, wind.mp), (wind.max_hp, wind.max_mp));

    let mist = battle.board().unit(5).unwrap();
    let template = catalog.get_template(&"mist".to_string()).unwrap();
    assert_eq!(mist.side, Side::Enemy);
    assert_eq!(mist.name, format!("{ENEMY_NAME_PREFIX}{}", template.name));
    assert_eq!(mist.pos, Pos::new(12, 3));

    // 速度：wind 20、mist 17、water 14、fire 12、metal 10
    assert_eq!(battle.turn_order().ids(), &[1, 5, 3, 2, 4]);
    assert_eq!(battle.current_actor().unwrap().id, 1);
    assert_eq!(battle.current_state(), BattleState::ChoosingAction);
}

#[test]
fn test_from_config_errors() {
    let catalog = Catalog::builtin().unwrap();

    let config = BattleConfig::lineup(&["wind"], &["dragon"]);
    match Battle::from_config(&config, &catalog) {
        Err(err) => assert!(
            matches!(
                root_error(&err),
                Error::MissingTemplate { template, .. } if template == "dragon"
            ),
            "got {err:?}"
        ),
        Ok(_) => panic!("Should return Error::MissingTemplate"),
    }

    let config = BattleConfig::lineup::<&str>(&["wind"], &[]);
    match Battle::from_config(&config, &catalog) {
        Err(err) => assert!(matches!(
            root_error(&err),
            Error::EmptySide {
                side: Side::Enemy,
                ..
            }
        )),
        Ok(_) => panic!("Should return Error::EmptySide"),
    }
}

#[test]
fn test_builtin_teleport_into_enemy_territory() {
    let (mut battle, _) = builtin_battle();
    battle.drain_events();

    battle.submit_action(ActionKind::Skill);
    battle.set_skill_cursor(1);
    battle.confirm_skill();
    assert_eq!(battle.selected_skill().unwrap().id, "gale_step");
    battle.submit_target(Pos::new(9, 1));

    let wind = battle.board().unit(1).unwrap();
    assert_eq!(wind.pos, Pos::new(9, 1));
    assert_eq!(wind.mp, wind.max_mp - 10);
    assert!(wind.in_enemy_territory);
    assert_eq!(battle.territory_of(wind.pos), Territory::EnemyZone);
    assert_eq!(battle.current_actor().unwrap().id, 5);
    assert_eq!(
        battle.drain_events(),
        vec![
            BattleEvent::SkillCast {
                caster: 1,
                skill: "gale_step".to_string(),
                aim: Pos::new(9, 1),
                cells: vec![],
            },
            BattleEvent::Teleported {
                unit: 1,
                from: Pos::new(2, 2),
                to: Pos::new(9, 1),
            },
            BattleEvent::TurnStarted { unit: 5 },
        ]
    );
}

#[test]
fn test_two_moves_per_turn() {
    let scene = scene_from_ascii_with(
        r#"
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . A . . . . . . E .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        "#,
        |marker, unit| {
            if marker == "A" {
                unit.speed = 99;
                give_skill(unit, Skill::default());
            }
        },
    );
    let actor = scene.id("A");
    let mut battle = Battle::new(scene.board).unwrap();
    battle.drain_events();

    battle.submit_action(ActionKind::Move);
    assert_eq!(battle.current_state(), BattleState::Moving);
    battle.submit_move(Pos::new(7, 3));
    assert_eq!(battle.current_state(), BattleState::AfterMove);
    assert_eq!(
        battle.legal_actions(),
        vec![ActionKind::Move, ActionKind::Skill, ActionKind::EndTurn]
    );
    assert_eq!(battle.territory_of(Pos::new(7, 3)), Territory::BufferZone);

    battle.submit_action(ActionKind::Move);
    battle.set_cursor(Pos::new(8, 3));
    battle.confirm_move();
    let unit = battle.board().unit(actor).unwrap();
    assert_eq!(unit.pos, Pos::new(8, 3));
    assert_eq!(unit.moved_count, 2);
    assert!(unit.in_enemy_territory);

    // 第三次移動不再出現在選單中
    assert_eq!(
        battle.legal_actions(),
        vec![ActionKind::Skill, ActionKind::EndTurn]
    );
    battle.submit_action(ActionKind::Move);
    assert_eq!(battle.current_state(), BattleState::AfterMove);
    assert_eq!(moved_events(&mut battle), 2);

    battle.submit_action(ActionKind::EndTurn);
    assert_ne!(battle.current_actor().unwrap().id, actor);
}

#[test]
fn test_rejected_moves_leave_state_unchanged() {
    let scene = scene_from_ascii_with(
        r#"
        A . . . . . . . . . . . . . .
        Ab . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . E
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        "#,
        |marker, unit| {
            if marker == "A" {
                unit.speed = 99;
            }
        },
    );
    let actor = scene.id("A");
    let mut battle = Battle::new(scene.board).unwrap();
    battle.drain_events();
    battle.submit_action(ActionKind::Move);
    assert_eq!(battle.move_targets(), &[Pos::new(1, 0)]);

    let test_data = [
        // 被友軍佔據
        Pos::new(0, 1),
        // 不相鄰
        Pos::new(2, 0),
        Pos::new(1, 1),
        // 棋盤外
        Pos::new(-1, 0),
        Pos::new(0, -1),
        // 原地
        Pos::new(0, 0),
    ];
    for (idx, pos) in test_data.into_iter().enumerate() {
        battle.submit_move(pos);
        assert_eq!(battle.current_state(), BattleState::Moving, "Case {idx}");
        assert_eq!(
            battle.board().unit(actor).unwrap().pos,
            Pos::new(0, 0),
            "Case {idx}"
        );
    }
    // 游標夾回邊界後仍然不是合法目的地
    battle.set_cursor(Pos::new(-5, -5));
    battle.confirm_move();
    assert_eq!(battle.current_state(), BattleState::Moving);
    assert_eq!(moved_events(&mut battle), 0);

    battle.submit_move(Pos::new(1, 0));
    assert_eq!(battle.board().unit(actor).unwrap().pos, Pos::new(1, 0));
    assert_eq!(moved_events(&mut battle), 1);
}

#[test]
fn test_skill_menu_respects_mp() {
    let cheap = Skill {
        id: "cheap".to_string(),
        mp_cost: 5,
        ..Default::default()
    };
    let costly = Skill {
        id: "costly".to_string(),
        mp_cost: 30,
        ..Default::default()
    };
    let scene = scene_from_ascii_with(
        r#"
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . A . . . . . . . . . E . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        Ax . . . . . . . . . . . . . .
        "#,
        move |marker, unit| match marker {
            "A" => {
                unit.speed = 99;
                unit.mp = 10;
                unit.skills = vec![cheap.clone(), costly.clone()];
            }
            // 沒有技能的角色不會出現技能選項
            "Ax" => unit.speed = 50,
            _ => {}
        },
    );
    let (caster, ax) = (scene.id("A"), scene.id("Ax"));
    let mut battle = Battle::new(scene.board).unwrap();

    battle.submit_action(ActionKind::Skill);
    battle.submit_skill_selection(1);
    assert_eq!(battle.current_state(), BattleState::SelectingSkill);
    assert!(battle.selected_skill().is_none());
    battle.submit_skill_selection(7);
    assert_eq!(battle.current_state(), BattleState::SelectingSkill);

    battle.set_skill_cursor(9);
    assert_eq!(battle.skill_cursor(), 1, "夾到最後一個技能");
    battle.set_skill_cursor(0);
    battle.confirm_skill();
    assert_eq!(battle.current_state(), BattleState::SelectingTargets);
    assert_eq!(battle.selected_skill().unwrap().id, "cheap");

    battle.submit_target(Pos::new(20, 3));
    assert_eq!(battle.current_state(), BattleState::SelectingTargets, "瞄準點在棋盤外");
    battle.submit_target(Pos::new(12, 3));
    assert_eq!(battle.board().unit(caster).unwrap().mp, 5);

    // 輪到 Ax
    assert_eq!(battle.current_actor().unwrap().id, ax);
    assert_eq!(
        battle.legal_actions(),
        vec![ActionKind::Move, ActionKind::EndTurn]
    );
    battle.submit_action(ActionKind::Skill);
    assert_eq!(battle.current_state(), BattleState::ChoosingAction);
}

#[test]
fn test_cast_after_move_and_empty_target_ends_turn() {
    let skill = Skill {
        effect: EffectKind::Displacement,
        shape: RangeShape::Single,
        displacement: DisplacementMode::Up,
        displacement_distance: 1,
        ..Default::default()
    };
    let scene = scene_from_ascii_with(
        r#"
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . A . . . . . . . . . E . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        "#,
        move |marker, unit| {
            if marker == "A" {
                unit.speed = 99;
                give_skill(unit, skill.clone());
            }
        },
    );
    let (actor, enemy) = (scene.id("A"), scene.id("E"));
    let mut battle = Battle::new(scene.board).unwrap();

    battle.submit_action(ActionKind::Move);
    battle.submit_move(Pos::new(3, 3));
    battle.submit_action(ActionKind::Skill);
    battle.submit_skill_selection(0);
    assert_eq!(battle.preview(), &[Pos::new(3, 3)]);
    battle.submit_target(Pos::new(5, 5));

    assert_eq!(battle.current_state(), BattleState::ChoosingAction);
    assert_eq!(battle.current_actor().unwrap().id, enemy);
    let events = battle.drain_events();
    assert_eq!(events.last(), Some(&BattleEvent::TurnStarted { unit: enemy }));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, BattleEvent::Displaced { .. }))
    );

    // 下一輪行動旗標重置
    battle.submit_action(ActionKind::EndTurn);
    let unit = battle.current_actor().unwrap();
    assert_eq!(unit.id, actor);
    assert_eq!((unit.moved_count, unit.has_moved, unit.has_acted), (0, false, false));
}

#[test]
fn test_death_before_cursor_keeps_rotation() {
    let poke = Skill {
        damage: 50,
        ..Default::default()
    };
    // 行動順序：Ax(99) -> Ey(80) -> Az(50) -> Ew(10)
    let scene = scene_from_ascii_with(
        r#"
        Ax . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . Ey . . . .
        . . Az . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . . . Ew
        "#,
        move |marker, unit| match marker {
            "Ax" => unit.speed = 99,
            "Ey" => {
                unit.speed = 80;
                unit.hp = 10;
            }
            "Az" => {
                unit.speed = 50;
                give_skill(unit, poke.clone());
            }
            _ => unit.speed = 10,
        },
    );
    let [ax, ey, az, ew] = ["Ax", "Ey", "Az", "Ew"].map(|m| scene.id(m));
    let mut battle = Battle::new(scene.board).unwrap();
    assert_eq!(battle.turn_order().ids(), &[ax, ey, az, ew]);

    battle.submit_action(ActionKind::EndTurn);
    battle.submit_action(ActionKind::EndTurn);
    assert_eq!(battle.current_actor().unwrap().id, az);
    battle.submit_action(ActionKind::Skill);
    battle.submit_skill_selection(0);
    battle.submit_target(Pos::new(10, 2));

    assert!(battle.board().unit(ey).is_none());
    assert_eq!(battle.turn_order().ids(), &[ax, az, ew]);
    assert_eq!(battle.current_actor().unwrap().id, ew, "不會跳過 Ew");
    battle.submit_action(ActionKind::EndTurn);
    assert_eq!(battle.current_actor().unwrap().id, ax);
    assert_eq!(battle.winner(), None);
}

#[test]
fn test_battle_end_is_terminal() {
    let finisher = Skill {
        damage: 500,
        shape: RangeShape::AllEnemies,
        ..Default::default()
    };
    let scene = scene_from_ascii_with(
        r#"
        . . . . . . . . . . . . . . .
        . . . . . . . . . E . . . . .
        . . . . . . . . . . . . . . .
        . . A . . . . . . . . . . . .
        . . . . . . . . . . . . . . .
        . . . . . . . . . . . . E . .
        . . . . . . . . . . . . . . .
        "#,
        move |marker, unit| {
            if marker == "A" {
                unit.speed = 99;
                give_skill(unit, finisher.clone());
            }
        },
    );
    let mut battle = Battle::new(scene.board).unwrap();
    battle.submit_action(ActionKind::Skill);
    battle.submit_skill_selection(0);
    battle.set_cursor(Pos::new(0, 0));
    assert_eq!(battle.preview(), &[Pos::new(9, 1), Pos::new(12, 5)]);
    battle.confirm_target();

    assert_eq!(battle.current_state(), BattleState::BattleEnd);
    assert_eq!(battle.winner(), Some(Side::Ally));
    assert_eq!(battle.fallen().len(), 2);
    assert!(battle.legal_actions().is_empty());
    assert!(battle.preview().is_empty());
    battle.drain_events();

    battle.submit_action(ActionKind::EndTurn);
    battle.submit_action(ActionKind::Skill);
    battle.set_cursor(Pos::new(4, 4));
    battle.submit_move(Pos::new(2, 2));
    battle.cancel();
    assert_eq!(battle.current_state(), BattleState::BattleEnd);
    assert!(battle.drain_events().is_empty());
}

#[test]
fn test_events_serialize_as_json() {
    let events = [
        (
            BattleEvent::Moved {
                unit: 1,
                from: Pos::new(2, 2),
                to: Pos::new(2, 1),
            },
            serde_json::json!({
                "moved": { "unit": 1, "from": { "x": 2, "y": 2 }, "to": { "x": 2, "y": 1 } }
            }),
        ),
        (
            BattleEvent::BattleEnded { winner: Side::Enemy },
            serde_json::json!({ "battle_ended": { "winner": "enemy" } }),
        ),
        (
            BattleEvent::FormationSkipped {
                unit: 3,
                to: Pos::new(4, 4),
            },
            serde_json::json!({ "formation_skipped": { "unit": 3, "to": { "x": 4, "y": 4 } } }),
        ),
    ];
    for (idx, (event, expected)) in events.into_iter().enumerate() {
        assert_eq!(serde_json::to_value(&event).unwrap(), expected, "Case {idx}");
    }
}
