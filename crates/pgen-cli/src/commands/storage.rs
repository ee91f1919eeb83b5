use anyhow::Result;
use pgen_schemas::GeneratedArtifact;

use super::Context;

pub fn summary(ctx: &Context) -> Result<()> {
    let svc = ctx.storage_service();
    let s = svc.storage_summary(&ctx.requester)?;
    println!("count={}", s.count);
    if s.count == 0 {
        return Ok(());
    }
    println!("source={}", s.source);
    if let Some(ts) = s.created_at_utc {
        println!("created_at_utc={}", ts.to_rfc3339());
    }
    for (i, p) in s.previews.iter().enumerate() {
        println!("{i}\t{p}");
    }
    Ok(())
}

/// `page` is 1-based on the command line.
pub fn page(ctx: &Context, page: usize) -> Result<()> {
    let svc = ctx.storage_service();
    let p = svc.storage_page(&ctx.requester, page.saturating_sub(1))?;
    println!("page={}/{} total={}", page, p.page_count.max(1), p.total);
    for (i, preview) in &p.entries {
        println!("{i}\t{preview}");
    }
    Ok(())
}

pub fn detail(ctx: &Context, index: usize) -> Result<()> {
    let svc = ctx.storage_service();
    let Some(d) = svc.storage_detail(&ctx.requester, index)? else {
        anyhow::bail!("no stored pattern at index {index}");
    };
    for line in &d.inputs {
        println!("in\t{line}");
    }
    for line in &d.outputs {
        println!("out\t{line}");
    }
    Ok(())
}

pub fn extract(ctx: &Context, count: usize) -> Result<()> {
    let svc = ctx.storage_service();
    let taken = svc.extract(&ctx.requester, count)?;
    println!("extracted={}", taken.len());
    for a in &taken {
        print_artifact(a);
    }
    Ok(())
}

pub fn delete(ctx: &Context, index: usize) -> Result<()> {
    let svc = ctx.storage_service();
    match svc.delete_artifact(&ctx.requester, index)? {
        Some(a) => println!("deleted={}", a.output_summary()),
        None => anyhow::bail!("no stored pattern at index {index}"),
    }
    Ok(())
}

pub fn clear(ctx: &Context) -> Result<()> {
    let svc = ctx.storage_service();
    svc.clear_storage(&ctx.requester)?;
    println!("cleared=true");
    Ok(())
}

fn print_artifact(a: &GeneratedArtifact) {
    let d = a.detail();
    println!("{} <= {}", d.outputs.join(", "), d.inputs.join(", "));
}
