use anyhow::Result;
use lotto_rd::utils::format_draw;
use lotto_rd::{
    DrawQuery, GameType, GenerateOptions, RecordManager, RequestContext, catalog,
};

pub async fn demonstrate_engine(manager: &RecordManager, ctx: &RequestContext) -> Result<()> {
    println!("\n🎲 Demonstrating the number engine...\n");

    println!("1️⃣  Available games:");
    for def in catalog::all() {
        println!("   • {} - {}", def.display_name, def.description);
    }

    println!("\n2️⃣  Demo combinations (not saved):");
    for game in GameType::ALL {
        let draws = manager.generate_demo(game, GenerateOptions::default(), 1)?;
        for draw in &draws {
            println!("   • {}: {}", game, format_draw(game, draw));
        }
    }

    println!("\n3️⃣  Generating and saving combinations:");
    let requests = [
        (GameType::Leidsa, GenerateOptions::with_secondary(), 2),
        (GameType::Leidsa, GenerateOptions::secondary_only(), 1),
        (GameType::Kino, GenerateOptions::default(), 2),
        (GameType::Pale, GenerateOptions::default(), 3),
        (GameType::Tripleta, GenerateOptions::default(), 3),
    ];
    for (game, options, quantity) in requests {
        match manager.generate_and_save(ctx, game, options, quantity).await {
            Ok(created) => {
                for saved in created {
                    println!(
                        "   ✓ {} {} ({})",
                        game,
                        format_draw(game, &saved.record.draw()),
                        saved.record.id
                    );
                    if let Some(warning) = saved.statistics_error {
                        println!("     ⚠ {}", warning.user_message());
                    }
                }
            }
            Err(e) => println!("   ✗ {}: {}", game, e.user_message()),
        }
    }

    println!("\n4️⃣  Latest saved combinations:");
    let page = manager
        .list_draws(
            ctx,
            DrawQuery {
                limit: Some(5),
                ..DrawQuery::default()
            },
        )
        .await?;
    println!("   Showing {} of {} records", page.items.len(), page.total);
    for record in &page.items {
        println!(
            "   • {} | {} | {}",
            record.generated_at.format("%Y-%m-%d %H:%M:%S"),
            record.game_type,
            format_draw(record.game_type, &record.draw())
        );
    }

    if let Some(oldest) = page.items.last() {
        println!("\n5️⃣  Soft-deleting {}:", oldest.id);
        manager.soft_delete(ctx, oldest.id).await?;
        println!("   ✓ deleted (a second delete is a no-op)");
        manager.soft_delete(ctx, oldest.id).await?;
    }

    if let Some(owner_id) = ctx.owner_id() {
        let stats = manager.compute_user_stats(ctx, owner_id).await?;
        println!("\n6️⃣  Account statistics:");
        println!("   Total generations: {}", stats.total_generations);
        for (game, count) in &stats.per_game_counts {
            println!("   • {}: {}", game, count);
        }
        println!("   Last activity: {}", stats.most_recent_activity.label_es());
    }

    println!("\n7️⃣  Hot and cold numbers (Kino):");
    let hot_cold = manager.get_hot_cold_numbers(GameType::Kino, 5).await?;
    let hot: Vec<String> = hot_cold
        .hot
        .iter()
        .map(|s| format!("{}×{}", s.number, s.frequency))
        .collect();
    let cold: Vec<String> = hot_cold.cold.iter().map(|s| s.number.to_string()).collect();
    println!("   🔥 {}", hot.join(", "));
    println!("   ❄️  {}", cold.join(", "));

    println!("\n✅ Demonstration completed!\n");
    Ok(())
}
