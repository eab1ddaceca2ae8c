use std::{fs::File, io::BufReader};

use aws_event_targets::{Event, ParserConfig};

pub fn main() {
    env_logger::init();

    let dispatcher = ParserConfig::new().to_dispatcher().unwrap();

    // Event records as persisted by the event catcher, e.g.
    // tests/data/events/cloud_watch/AWS_API_CALL_StartInstances.json
    for path in std::env::args().skip(1) {
        let event: Event = serde_json::from_reader(BufReader::new(File::open(&path).unwrap()))
            .unwrap();

        let targets = dispatcher.parse(&event);
        println!("{} ({}): {} target(s)", path, event.event_type, targets.len());
        for target in targets {
            println!("  {}", serde_json::to_string(&target).unwrap());
        }
    }
}
