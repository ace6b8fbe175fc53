use rand::{rngs::StdRng, seq::SliceRandom};
use rlab_core::{
    env::{Env, EnvironmentDescription, Observation, Sample, Space, check_action},
    error::{Result, RlError},
};

/// Aces count 1 (or 11, see [`has_usable_ace`]), face cards count 10.
pub type Card = u8;

pub const ACE: Card = 1;
const NUM_ACTIONS: usize = 2;
const STAND: usize = 0;
const DEALER_STANDS_AT: u32 = 17;
const NATURAL_PAYOUT: f32 = 1.5;

fn unshuffled_deck() -> Vec<Card> {
    (0..52).map(|i| ((i % 13) + 1).min(10) as Card).collect()
}

fn raw_sum(hand: &[Card]) -> u32 {
    hand.iter().map(|c| *c as u32).sum()
}

/// An ace that can count as 11 without busting the hand.
pub fn has_usable_ace(hand: &[Card]) -> bool {
    hand.contains(&ACE) && raw_sum(hand) + 10 <= 21
}

pub fn sum_hand(hand: &[Card]) -> u32 {
    if has_usable_ace(hand) {
        raw_sum(hand) + 10
    } else {
        raw_sum(hand)
    }
}

pub fn is_bust(hand: &[Card]) -> bool {
    sum_hand(hand) > 21
}

pub fn score_hand(hand: &[Card]) -> u32 {
    if is_bust(hand) { 0 } else { sum_hand(hand) }
}

/// +1 when the player wins, -1 when the dealer wins, 0 on a draw.
pub fn compare_hands(player: &[Card], dealer: &[Card]) -> f32 {
    let player_score = score_hand(player);
    let dealer_score = score_hand(dealer);
    (player_score > dealer_score) as i32 as f32 - (player_score < dealer_score) as i32 as f32
}

pub fn is_natural(hand: &[Card]) -> bool {
    hand.len() == 2 && hand.contains(&ACE) && hand.contains(&10)
}

#[derive(Debug, Clone)]
pub struct Blackjack {
    natural: bool,
    done: bool,
    deck: Vec<Card>,
    dealer: Vec<Card>,
    player: Vec<Card>,
}

impl Default for Blackjack {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Blackjack {
    /// With `natural` set, winning with an untouched ace + ten pays 1.5 instead of 1.
    pub fn new(natural: bool) -> Self {
        Self {
            natural,
            done: true,
            deck: vec![],
            dealer: vec![],
            player: vec![],
        }
    }

    fn state(&self) -> Observation {
        vec![
            sum_hand(&self.player) as f32,
            self.dealer.first().copied().unwrap_or_default() as f32,
            has_usable_ace(&self.player) as u8 as f32,
        ]
    }

    fn draw_card(&mut self) -> Result<Card> {
        self.deck.pop().ok_or(RlError::DeckExhausted)
    }

    fn apply_natural_factor(&self, reward: f32) -> f32 {
        if reward == 1. && self.natural && is_natural(&self.player) {
            NATURAL_PAYOUT
        } else {
            reward
        }
    }
}

impl Env for Blackjack {
    fn name(&self) -> &str {
        "Blackjack"
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::bounded(vec![2., 1., 0.], vec![31., 10., 1.]),
            Space::Discrete(NUM_ACTIONS),
        )
    }

    fn reset(&mut self, rng: &mut StdRng) -> Observation {
        self.deck = unshuffled_deck();
        self.deck.shuffle(rng);
        let hands = self.deck.split_off(self.deck.len() - 4);
        self.player = hands[..2].to_vec();
        self.dealer = hands[2..].to_vec();
        self.done = false;
        self.state()
    }

    fn step(&mut self, action: usize) -> Result<Sample> {
        check_action(action, NUM_ACTIONS)?;
        if self.done {
            return Err(RlError::EpisodeDone);
        }

        if action != STAND {
            let card = self.draw_card()?;
            self.player.push(card);
            if is_bust(&self.player) {
                self.done = true;
                return Ok(Sample::new(self.state(), -1., true));
            }
            return Ok(Sample::new(self.state(), 0., false));
        }

        while sum_hand(&self.dealer) < DEALER_STANDS_AT {
            let card = self.draw_card()?;
            self.dealer.push(card);
        }
        self.done = true;
        let reward = self.apply_natural_factor(compare_hands(&self.player, &self.dealer));
        Ok(Sample::new(self.state(), reward, true))
    }
}
