//! Warm-up Task
//!
//! Runs the startup countdown on its own ticker, one step per warm-up step
//! period. Each step shows the remaining seconds, sets the indicator color
//! and chirps the buzzer. The last step opens the warm-up gate; after that
//! the task ends.
//!
//! Nothing here blocks other tasks: every wait is an executor timer.

#[cfg(feature = "rp2350")]
mod firmware {
    use embassy_rp::pwm::{self, Pwm, SetDutyCycle};
    use embassy_time::{Ticker, Timer};

    use crate::system::config::BehaviorConfig;
    use crate::system::indicator::{IndicatorColor, Tone, COUNTDOWN_TONE};
    use crate::system::resources::WarmUpResources;
    use crate::system::telemetry::{setup_page, StatusDisplay};
    use crate::system::warm_up::{WarmUpGate, WarmUpSequence, WarmUpStep};
    use crate::task::telemetry::RttDisplay;

    /// Indicator LED PWM frequency
    const LED_PWM_FREQ_HZ: u32 = 100;

    /// PWM config with the given frequency and a 0% duty cycle
    fn pwm_config(freq_hz: u32) -> pwm::Config {
        let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();

        // Minimum divider that keeps the period within 16 bits
        let divider = ((clock_freq_hz / freq_hz) / 65535 + 1) as u8;
        let period = (clock_freq_hz / (freq_hz * divider as u32)) as u16 - 1;

        let mut config = pwm::Config::default();
        config.divider = divider.into();
        config.top = period;
        config.compare_a = 0;
        config
    }

    struct Indicator {
        red: Pwm<'static>,
        green: Pwm<'static>,
        blue: Pwm<'static>,
    }

    impl Indicator {
        fn show(&mut self, color: IndicatorColor) {
            let (red, green, blue) = color.channels();
            for (pwm, on) in [(&mut self.red, red), (&mut self.green, green), (&mut self.blue, blue)] {
                let _ = if on {
                    pwm.set_duty_cycle_fully_on()
                } else {
                    pwm.set_duty_cycle_fully_off()
                };
            }
        }
    }

    struct Buzzer {
        pwm: Pwm<'static>,
    }

    impl Buzzer {
        async fn play(&mut self, tone: Tone) {
            let mut config = pwm_config(tone.frequency_hz);
            config.compare_a = config.top / 2;
            self.pwm.set_config(&config);
            Timer::after(tone.length).await;

            config.compare_a = 0;
            self.pwm.set_config(&config);
        }
    }

    /// Warm-up task: countdown, then open the gate exactly once
    #[embassy_executor::task]
    pub async fn warm_up(r: WarmUpResources, gate: &'static WarmUpGate, config: BehaviorConfig) {
        let led = pwm_config(LED_PWM_FREQ_HZ);
        let mut indicator = Indicator {
            red: Pwm::new_output_a(r.pwm_red, r.red_pin, led.clone()),
            green: Pwm::new_output_a(r.pwm_green, r.green_pin, led.clone()),
            blue: Pwm::new_output_a(r.pwm_blue, r.blue_pin, led),
        };
        indicator.show(IndicatorColor::Off);
        let mut buzzer = Buzzer {
            pwm: Pwm::new_output_a(r.pwm_buzzer, r.buzzer_pin, pwm_config(COUNTDOWN_TONE.frequency_hz)),
        };
        let mut display = RttDisplay;

        crate::log_info!("warm-up started, {} s", config.warm_up_steps);
        let mut sequence = WarmUpSequence::new(config.warm_up_steps);
        let mut ticker = Ticker::every(config.warm_up_step);
        loop {
            match sequence.step(gate) {
                WarmUpStep::Countdown {
                    remaining,
                    color,
                    tone,
                } => {
                    crate::log_info!("warm-up: {}", remaining);
                    indicator.show(color);
                    let _ = display.render(&setup_page(remaining));
                    buzzer.play(tone).await;
                }
                WarmUpStep::Ready { color, tone } => {
                    indicator.show(color);
                    buzzer.play(tone).await;
                    break;
                }
                WarmUpStep::Done => break,
            }
            ticker.next().await;
        }
    }
}

#[cfg(feature = "rp2350")]
pub use firmware::warm_up;
