use std::cmp::Ordering;

use crate::models::{Filter, Priority, SortKey, Stats, Todo};

/// Computes the derived view: search match first, then status filter, then
/// sort. Pure over its inputs; callers re-run it on every access.
pub fn filtered(todos: &[Todo], filter: Filter, sort_by: SortKey, search: &str) -> Vec<Todo> {
    let query = search.trim().to_lowercase();

    let mut result: Vec<Todo> = todos
        .iter()
        .filter(|todo| matches_search(todo, &query))
        .filter(|todo| match filter {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        })
        .cloned()
        .collect();

    result.sort_by(|a, b| compare(a, b, sort_by));
    result
}

fn matches_search(todo: &Todo, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    todo.title.to_lowercase().contains(query)
        || todo
            .description
            .as_ref()
            .is_some_and(|d| d.to_lowercase().contains(query))
}

fn compare(a: &Todo, b: &Todo, sort_by: SortKey) -> Ordering {
    match sort_by {
        SortKey::Priority => priority_rank(a.priority).cmp(&priority_rank(b.priority)),
        SortKey::DueDate => match (a.due_date, b.due_date) {
            // Undated items always sort after dated ones.
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(&b),
        },
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Created => b.created_at.cmp(&a.created_at),
    }
}

fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

pub fn stats(todos: &[Todo]) -> Stats {
    let total = todos.len();
    let completed = todos.iter().filter(|t| t.completed).count();
    let high_priority = todos
        .iter()
        .filter(|t| t.priority == Priority::High && !t.completed)
        .count();
    Stats {
        total,
        completed,
        active: total - completed,
        high_priority,
    }
}
