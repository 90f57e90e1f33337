//! Counters Example - two independent counters
//!
//! Mounts an app with two counters (starting at -2 and 7), draws every
//! commit to the terminal and simulates a click on each button.
//!
//! Run with: cargo run --example counters

use spark_fiber::{
    create_element, leaf, mount_terminal, use_state, Callback, Component, MemoryHost, Props, Scheduler,
    SchedulerConfig,
};

fn counter(name: &str, initial: i64, step: i64) -> Component {
    Component::new(name, move |props| {
        let (count, set_count) = use_state(initial);
        let label = props.get_str("label").unwrap_or("count").to_string();
        let on_click = Callback::new(move |_| set_count.update(move |c| c + step));
        create_element(
            "p",
            Props::new(),
            [
                create_element("b", Props::new(), [format!("{label}: ")]),
                create_element("button", Props::new().with("onclick", on_click), [count]),
            ],
        )
    })
}

fn main() -> spark_fiber::Result<()> {
    println!("=== spark-fiber Counters Example ===\n");

    let up = counter("Up", -2, 1);
    let down = counter("Down", 7, -1);
    let app = Component::new("App", move |_| {
        create_element(
            "main",
            Props::new(),
            [
                create_element("h1", Props::new(), ["Counters"]),
                leaf(&up, Props::new().with("label", "up")),
                leaf(&down, Props::new().with("label", "down")),
            ],
        )
    });

    let host = MemoryHost::new();
    let container = host.create_container("root");
    let scheduler = Scheduler::with_config(host.clone(), SchedulerConfig::from_env());
    let handle = mount_terminal(&scheduler, std::io::stdout());

    scheduler.render(leaf(&app, Props::new()), container.clone())?;

    for index in 0..2 {
        println!("--- click button {index} ---");
        // Each click commits a fresh tree, so look the button up again.
        container.find_all("button")[index].dispatch("onclick");
    }

    println!("\nmarkup: {}", container.inner_markup());
    println!("frames drawn: {}, host nodes created: {}", handle.frames(), host.nodes_created());
    handle.unmount();
    Ok(())
}
