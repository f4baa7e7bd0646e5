use anyhow::{bail, Context, Result};
use scanorder::order::{OrderFilter, OrderRow, StatusUpdate};
use scanorder::{OrderQuery, OrderStatus, OrderUpdater};

use super::AppContext;

fn query(ctx: &AppContext) -> OrderQuery {
    OrderQuery::new(ctx.workbook.clone(), ctx.config.sheets.clone())
}

fn print_row(order: &OrderRow) {
    println!(
        "{:<10} {:<19} {:<12} {:<14} {:<14} {}",
        order.order_id, order.created_at, order.serial, order.variant, order.status, order.urgent
    );
}

pub fn show(ctx: &AppContext, order_id: &str, json: bool) -> Result<()> {
    let Some(details) = query(ctx)
        .details(order_id)
        .with_context(|| format!("Failed to read order {}", order_id))?
    else {
        bail!("Order {} not found", order_id.trim());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    let order = &details.order;
    println!("Order:       {}", order.order_id);
    println!("Created:     {}", order.created_at);
    println!("Status:      {}", order.status);
    println!("Urgent:      {}", order.urgent);
    println!("Serial:      {}", order.serial);
    println!("Variant:     {}", order.variant);
    println!("Machine:     {} / {} / {}", order.machine, order.station, order.coordinate);
    println!("Model:       {} (OT {}, batch {})", order.model, order.work_order, order.batch);
    println!("Requested:   {}", order.requested_by);
    println!("Updated:     {} by {}", order.updated_at, order.updated_by);
    if !order.separation_owner.is_empty() {
        println!("Separation:  {} at {}", order.separation_owner, order.separation_at);
    }
    if !order.pickup_owner.is_empty() {
        println!("Pickup:      {} at {}", order.pickup_owner, order.pickup_at);
    }
    if !order.notes.is_empty() {
        println!("Notes:       {}", order.notes);
    }
    println!("Items:");
    for item in &details.items {
        println!("  {} x{}", item.serial, item.quantity);
    }
    Ok(())
}

pub fn list(
    ctx: &AppContext,
    status: Option<&str>,
    limit: Option<usize>,
    newest_first: bool,
    json: bool,
) -> Result<()> {
    let filter = OrderFilter {
        status: status.map(OrderStatus::parse),
        newest_first,
        limit,
    };
    let orders = query(ctx).list(&filter).context("Failed to list orders")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&orders)?);
        return Ok(());
    }
    if orders.is_empty() {
        println!("No orders");
    }
    for order in &orders {
        print_row(order);
    }
    Ok(())
}

pub fn set_status(
    ctx: &AppContext,
    order_id: &str,
    status: &str,
    actor: &str,
    mark_urgent_done: bool,
) -> Result<()> {
    let status = OrderStatus::parse(status);
    if let OrderStatus::Other(label) = &status {
        bail!(
            "Unknown status '{}'; expected PENDENTE, EM SEPARAÇÃO, EM COLETA, CONCLUÍDO or CANCELADO",
            label
        );
    }

    let updater = OrderUpdater::new(
        ctx.workbook.clone(),
        ctx.config.sheets.clone(),
        ctx.lock.clone(),
        ctx.lock_timeout(),
    );
    let update = StatusUpdate {
        order_id: order_id.to_string(),
        status,
        actor: actor.to_string(),
        at: ctx.clock.now(),
        mark_urgent_done,
    };
    let order = updater
        .update_status(&update)
        .with_context(|| format!("Failed to update order {}", order_id))?;

    print_row(&order);
    Ok(())
}
