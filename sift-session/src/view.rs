use sift_media::{MediaCache, Tier};

use crate::{
    catalog::{AssetSource, Filter},
    model::{
        group::ItemGroup,
        item::{Item, ItemKind},
        stats::{format_bytes, SessionStats},
    },
    session::Session,
};

pub fn print_overview<S: AssetSource>(session: &Session<S>) {
    println!(
        "{} — {} items, {} remaining ({})",
        session.filter().display_name(),
        session.total(),
        session.remaining(),
        session.progress_text(),
    );

    if session.marked_count() > 0 || session.maybe_count() > 0 {
        println!(
            "{} marked for deletion, {} in the maybe pile",
            session.marked_count(),
            session.maybe_count(),
        );
    }
}

pub async fn print_current<S: AssetSource>(session: &Session<S>, cache: &MediaCache) {
    let Some(item) = session.current_item() else {
        println!("all done for this filter — f to change, u to undo, commit to empty the trash");
        return;
    };

    let captured = item
        .created_at
        .map(|created| created.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown date".to_string());

    println!(
        "{} — {}, {}, {}",
        item.id,
        kind_label(item),
        captured,
        format_bytes(item.byte_size),
    );

    match cache.fetch(&item.id, Tier::Card).await {
        Some(image) => println!("preview ready ({}x{})", image.width(), image.height()),
        None => println!("no preview available"),
    }
}

pub async fn print_detail<S: AssetSource>(session: &Session<S>, cache: &MediaCache) {
    let Some(item) = session.current_item() else {
        println!("no current item");
        return;
    };

    match cache.fetch(&item.id, Tier::Full).await {
        Some(image) => println!(
            "{} at full resolution ({}x{})",
            item.id,
            image.width(),
            image.height()
        ),
        None => println!("no image available for {}", item.id),
    }
}

pub fn print_items(title: &str, items: &[Item]) {
    if items.is_empty() {
        println!("{} is empty", title);
        return;
    }

    println!("{} ({} items):", title, items.len());
    for item in items {
        println!("  {} — {}", item.id, format_bytes(item.byte_size));
    }
}

pub fn print_groups(groups: &[ItemGroup]) {
    println!("{} burst groups:", groups.len());
    for group in groups {
        let started = group
            .started_at
            .map(|started| started.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown date".to_string());

        println!("  {} items from {}", group.len(), started);
    }
}

pub fn print_stats(stats: &SessionStats) {
    println!(
        "reviewed {}, deleted {}, freed {}",
        stats.items_reviewed,
        stats.items_deleted,
        format_bytes(stats.bytes_freed),
    );
}

pub fn print_years(years: &[i32]) {
    if years.is_empty() {
        println!("no capture years available");
        return;
    }

    let listed: Vec<String> = years.iter().map(|year| year.to_string()).collect();
    println!("years: {}", listed.join(", "));
}

pub fn print_filters() {
    for filter in Filter::all() {
        println!("  {} — {}", filter.as_str(), filter.display_name());
    }
}

pub fn print_help() {
    println!("k/keep, d/delete, m/maybe — decide the current item");
    println!("u/undo — take back the last decision");
    println!("f <filter> [year] — switch the working set:");
    print_filters();
    println!("t/trash, p/pile — list deletion candidates and maybes");
    println!("restore — pull everything out of the trash");
    println!("commit — delete the trash at the source");
    println!("g/groups, s/stats, years, detail, refresh, reset, q/quit");
}

fn kind_label(item: &Item) -> &'static str {
    match item.kind {
        ItemKind::Photo if item.is_screenshot => "screenshot",
        ItemKind::Photo => "photo",
        ItemKind::Video => "video",
        ItemKind::LivePhoto => "live photo",
    }
}
