// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

use {
    super::*,
    glib::{prelude::IsA, MainContext, MainLoop, Source},
    hinawa::{prelude::FwNodeExt, FwNode},
    hitaki::{prelude::AlsaFirewireExt, AlsaFirewire},
    std::{sync::Arc, thread, time::Duration},
    tracing::{debug, warn},
};

/// The thread to dispatch events from sources attached to own context.
pub struct Dispatcher {
    name: String,
    th: Option<thread::JoinHandle<()>>,
    ev_loop: Arc<MainLoop>,
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.ev_loop.quit();

        if let Some(th) = self.th.take() {
            if th.join().is_err() {
                warn!(name = self.name.as_str(), "Fail to join thread");
            }
        }
        debug!(name = self.name.as_str(), "Dispatcher stops");
    }
}

impl Dispatcher {
    const LAUNCH_POLL_INTERVAL: Duration = Duration::from_millis(10);

    pub fn run(name: String) -> Result<Dispatcher, Error> {
        // Use own context.
        let ctx = MainContext::new();
        let ev_loop = Arc::new(MainLoop::new(Some(&ctx), false));

        // launch one thread to dispatch all events.
        let l = ev_loop.clone();
        let th = thread::Builder::new()
            .name(name.clone())
            .spawn(move || l.run())?;

        while !ev_loop.is_running() {
            thread::sleep(Self::LAUNCH_POLL_INTERVAL);
        }
        debug!(name = name.as_str(), "Dispatcher runs");

        let th = Some(th);
        Ok(Dispatcher { name, th, ev_loop })
    }

    pub fn is_running(&self) -> bool {
        self.ev_loop.is_running()
    }

    pub fn stop(&mut self) {
        self.ev_loop.quit();
    }

    fn attach_src_to_ctx(&mut self, src: &Source) {
        let ctx = self.ev_loop.context();
        src.attach(Some(&ctx));
    }

    pub fn attach_alsa_firewire<U, F>(&mut self, unit: &U, disconnect_cb: F) -> Result<(), Error>
    where
        U: IsA<AlsaFirewire>,
        F: Fn(&U) + Send + 'static,
    {
        let src = unit
            .create_source()
            .map_err(|err| hwdep::from_glib_error(err, "source of ALSA hwdep"))?;

        unit.connect_is_disconnected_notify(disconnect_cb);

        self.attach_src_to_ctx(&src);

        Ok(())
    }

    pub fn attach_fw_node<N, F>(&mut self, node: &N, disconnect_cb: F) -> Result<(), Error>
    where
        N: IsA<FwNode>,
        F: Fn(&N) + Send + Sync + 'static,
    {
        let src = node
            .create_source()
            .map_err(|err| hwdep::from_glib_error(err, "source of FireWire node"))?;

        node.connect_disconnected(disconnect_cb);

        self.attach_src_to_ctx(&src);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        glib::{source, ControlFlow},
        std::sync::mpsc,
    };

    #[test]
    fn dispatch_and_stop() {
        let mut dispatcher = Dispatcher::run("test".to_string()).unwrap();
        assert!(dispatcher.is_running());

        let (tx, rx) = mpsc::channel();
        let src = source::timeout_source_new(
            Duration::from_millis(1),
            None,
            source::Priority::DEFAULT,
            move || {
                let _ = tx.send(thread::current().name().map(|name| name.to_string()));
                ControlFlow::Break
            },
        );
        dispatcher.attach_src_to_ctx(&src);

        let name = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(name.as_deref(), Some("test"));

        dispatcher.stop();
        while dispatcher.is_running() {
            thread::sleep(Dispatcher::LAUNCH_POLL_INTERVAL);
        }
    }
}
